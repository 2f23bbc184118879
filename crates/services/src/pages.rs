use crate::error::PageError;

/// Splits a stored book file into pages of text.
pub trait PageSource: Send + Sync {
    /// Number of pages in the document.
    ///
    /// # Errors
    ///
    /// Returns `PageError` if the document cannot be read.
    fn page_count(&self, bytes: &[u8]) -> Result<u32, PageError>;

    /// Text of pages `start..=end` (0-based) joined by newlines. An inverted
    /// range yields an empty string.
    ///
    /// # Errors
    ///
    /// Returns `PageError` if the document cannot be read or `end` is past
    /// the last page.
    fn pages_text(&self, bytes: &[u8], start: u32, end: u32) -> Result<String, PageError>;
}

/// Plain UTF-8 documents whose pages are separated by form feeds (`\x0c`).
#[derive(Debug, Clone, Copy, Default)]
pub struct FormFeedPages;

pub const PAGE_BREAK: char = '\u{c}';

impl FormFeedPages {
    fn pages(bytes: &[u8]) -> Result<Vec<&str>, PageError> {
        let text = std::str::from_utf8(bytes).map_err(|_| PageError::Encoding)?;
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(text.split(PAGE_BREAK).collect())
    }
}

fn count(pages: &[&str]) -> u32 {
    u32::try_from(pages.len()).unwrap_or(u32::MAX)
}

impl PageSource for FormFeedPages {
    fn page_count(&self, bytes: &[u8]) -> Result<u32, PageError> {
        Ok(count(&Self::pages(bytes)?))
    }

    fn pages_text(&self, bytes: &[u8], start: u32, end: u32) -> Result<String, PageError> {
        let pages = Self::pages(bytes)?;
        if end < start {
            return Ok(String::new());
        }
        let total = count(&pages);
        if end >= total {
            return Err(PageError::OutOfRange {
                page: end,
                count: total,
            });
        }
        let (start, end) = (start as usize, end as usize);
        Ok(pages[start..=end].join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK: &[u8] = b"Contents\x0cChapter one\x0cChapter two\x0cIndex";

    #[test]
    fn counts_pages() {
        assert_eq!(FormFeedPages.page_count(BOOK), Ok(4));
        assert_eq!(FormFeedPages.page_count(b""), Ok(0));
    }

    #[test]
    fn joins_inclusive_range() {
        assert_eq!(
            FormFeedPages.pages_text(BOOK, 1, 2).unwrap(),
            "Chapter one\nChapter two"
        );
        assert_eq!(FormFeedPages.pages_text(BOOK, 3, 2).unwrap(), "");
    }

    #[test]
    fn rejects_pages_past_the_end() {
        assert_eq!(
            FormFeedPages.pages_text(BOOK, 2, 4),
            Err(PageError::OutOfRange { page: 4, count: 4 })
        );
        assert_eq!(
            FormFeedPages.page_count(&[0xff, 0xfe]),
            Err(PageError::Encoding)
        );
    }
}
