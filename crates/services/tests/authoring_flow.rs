use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quiz_core::model::{Book, BookId, UserId};
use quiz_core::time::fixed_clock;
use services::{
    AppServices, AuthoringOracles, ChatOracles, ContentsLayout, FormFeedPages, LlmOracle,
    OracleError, QuestionGenerator, QuestionImprover, SectionExtractor, SectionOutline,
    SectionServiceError,
};
use storage::files::InMemoryFileStore;
use storage::repository::Storage;

#[derive(Default)]
struct AuthoringFake {
    contents_seen: Mutex<Vec<String>>,
}

#[async_trait]
impl SectionExtractor for AuthoringFake {
    async fn extract_sections(
        &self,
        contents: &str,
        _example_titles: &[String],
    ) -> Result<Vec<SectionOutline>, OracleError> {
        self.contents_seen.lock().unwrap().push(contents.to_owned());
        Ok(vec![
            SectionOutline {
                title: "Energy".into(),
                page_number: 4,
            },
            SectionOutline {
                title: "Appendix".into(),
                page_number: 9,
            },
            SectionOutline {
                title: "Motion".into(),
                page_number: 1,
            },
        ])
    }
}

#[async_trait]
impl QuestionGenerator for AuthoringFake {
    async fn generate_questions(
        &self,
        _content: &str,
        count: u32,
    ) -> Result<Vec<String>, OracleError> {
        let mut questions = vec!["What is work?".to_owned(), "   ".to_owned()];
        questions.extend((2..count).map(|i| format!("Question {i}")));
        Ok(questions)
    }
}

#[async_trait]
impl QuestionImprover for AuthoringFake {
    async fn improve_question(
        &self,
        question: &str,
        feedback: &str,
    ) -> Result<String, OracleError> {
        Ok(format!("{question} ({feedback})"))
    }
}

/// Ten file pages `p0`..`p9`, table of contents on page 1.
fn book_bytes() -> Vec<u8> {
    (0..10)
        .map(|i| format!("p{i}"))
        .collect::<Vec<_>>()
        .join("\u{c}")
        .into_bytes()
}

async fn setup() -> (AppServices, Arc<AuthoringFake>, Book) {
    let fake = Arc::new(AuthoringFake::default());
    let llm = Arc::new(LlmOracle::new(None).unwrap());
    let services = AppServices::with_parts(
        fixed_clock(),
        Storage::in_memory(),
        Arc::new(InMemoryFileStore::new()),
        Arc::new(FormFeedPages),
        ChatOracles::from_shared(llm),
        AuthoringOracles::from_shared(Arc::clone(&fake)),
    );
    let book = services
        .book_service()
        .upload_book(book_bytes(), "Physics", "pdf", UserId::new_v4())
        .await
        .unwrap();
    (services, fake, book)
}

fn layout() -> ContentsLayout {
    ContentsLayout {
        example_titles: vec!["Kinematics".into()],
        first_page: 3,
        content_end_page: 6,
        contents_start: 1,
        contents_end: 1,
    }
}

fn titles(sections: &[quiz_core::model::Section]) -> Vec<String> {
    sections.iter().map(quiz_core::model::Section::title).collect()
}

#[tokio::test]
async fn sections_are_built_from_contents() {
    let (services, fake, book) = setup().await;
    let sections = services
        .section_service()
        .create_sections_from_contents(book.id(), &layout())
        .await
        .unwrap();

    assert_eq!(fake.contents_seen.lock().unwrap().as_slice(), &["p1".to_owned()]);
    assert_eq!(titles(&sections), vec!["1. Motion", "2. Energy"]);

    assert_eq!((sections[0].start_page(), sections[0].end_page()), (1, 4));
    assert_eq!(sections[0].text(), Some("p2\np3\np4"));
    assert_eq!((sections[1].start_page(), sections[1].end_page()), (4, 6));
    assert_eq!(sections[1].text(), Some("p5\np6"));

    let stored = services.book_service().get_book(book.id()).await.unwrap();
    assert_eq!(stored.first_page(), Some(3));
}

#[tokio::test]
async fn adding_and_deleting_sections_keeps_order_contiguous() {
    let (services, _fake, book) = setup().await;
    let sections = services.section_service();
    sections
        .create_sections_from_contents(book.id(), &layout())
        .await
        .unwrap();

    let waves = sections
        .add_section(book.id(), 6, 7, "Waves", Some(1))
        .await
        .unwrap();
    assert_eq!(waves.order(), 1);
    assert_eq!(waves.text(), Some("p7"));

    let optics = sections
        .add_section(book.id(), 7, 8, "Optics", None)
        .await
        .unwrap();
    assert_eq!(optics.order(), 4);

    let listed = sections.list_sections(book.id()).await.unwrap();
    assert_eq!(
        titles(&listed),
        vec!["1. Waves", "2. Motion", "3. Energy", "4. Optics"]
    );

    sections.delete_section(listed[1].id()).await.unwrap();
    let listed = sections.list_sections(book.id()).await.unwrap();
    assert_eq!(titles(&listed), vec!["1. Waves", "2. Energy", "3. Optics"]);

    sections.delete_section(listed[1].id()).await.unwrap();
    assert!(matches!(
        sections.delete_section(listed[1].id()).await,
        Err(SectionServiceError::NotFound(_))
    ));

    assert_eq!(sections.delete_all_sections(book.id()).await.unwrap(), 2);
}

#[tokio::test]
async fn updating_pages_rereads_text() {
    let (services, _fake, book) = setup().await;
    let sections = services.section_service();
    let created = sections
        .create_sections_from_contents(book.id(), &layout())
        .await
        .unwrap();
    let energy = &created[1];

    let renamed = sections
        .update_section(energy.id(), "Energy and Work", 4, 6)
        .await
        .unwrap();
    assert_eq!(renamed.name(), "Energy and Work");
    assert_eq!(renamed.text(), Some("p5\np6"));

    let moved = sections
        .update_section(energy.id(), "Energy and Work", 4, 5)
        .await
        .unwrap();
    assert_eq!(moved.text(), Some("p5"));
}

#[tokio::test]
async fn question_generation_requires_text() {
    let (services, _fake, book) = setup().await;
    let sections = services.section_service();
    let created = sections
        .create_sections_from_contents(book.id(), &layout())
        .await
        .unwrap();
    let motion = &created[0];

    let generated = sections.generate_questions(motion.id(), 3).await.unwrap();
    let texts: Vec<&str> = generated.iter().map(|q| q.text()).collect();
    assert_eq!(texts, vec!["What is work?", "Question 2"]);
    assert!(generated.iter().all(|q| q.kind() == "general"));
    assert_eq!(sections.questions(motion.id()).await.unwrap(), generated);

    // a single-page section has an empty text range
    let blank = sections
        .add_section(book.id(), 7, 7, "Blank", None)
        .await
        .unwrap();
    assert!(matches!(
        sections.generate_questions(blank.id(), 3).await,
        Err(SectionServiceError::MissingText(id)) if id == blank.id()
    ));

    let with_questions = services
        .book_service()
        .book_sections(book.id(), true)
        .await
        .unwrap();
    assert_eq!(with_questions.len(), 1);
    assert_eq!(with_questions[0].id(), motion.id());
}

#[tokio::test]
async fn questions_can_be_edited_and_improved() {
    let (services, _fake, book) = setup().await;
    let sections = services.section_service();
    let created = sections
        .create_sections_from_contents(book.id(), &layout())
        .await
        .unwrap();
    let section_id = created[0].id();

    let question = sections
        .add_question(section_id, "What is speed?", None)
        .await
        .unwrap();
    assert_eq!(question.kind(), "general");

    let updated = sections
        .update_question(section_id, question.id(), "What is velocity?", Some("recall"))
        .await
        .unwrap();
    assert_eq!(updated.id(), question.id());
    assert_eq!(updated.kind(), "recall");

    let improved = sections
        .improve_question(section_id, question.id(), "mention direction")
        .await
        .unwrap();
    assert_eq!(improved.text(), "What is velocity? (mention direction)");
    assert_eq!(
        sections.question(section_id, question.id()).await.unwrap(),
        improved
    );

    let owner = sections.section_by_question(question.id()).await.unwrap();
    assert_eq!(owner.id(), section_id);

    assert_eq!(
        sections.delete_question(section_id, question.id()).await.unwrap(),
        question.id()
    );
    assert!(matches!(
        sections.section_by_question(question.id()).await,
        Err(SectionServiceError::QuestionNotFound(_))
    ));
    assert!(matches!(
        sections.add_question(section_id, "  ", None).await,
        Err(SectionServiceError::Question(_))
    ));
}

#[tokio::test]
async fn missing_book_is_reported() {
    let (services, _fake, _book) = setup().await;
    let err = services
        .section_service()
        .create_sections_from_contents(BookId::new_v4(), &layout())
        .await
        .unwrap_err();
    assert!(matches!(err, SectionServiceError::Book(_)));
}
