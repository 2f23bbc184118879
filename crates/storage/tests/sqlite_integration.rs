use chrono::Duration;
use quiz_core::model::{
    Book, BookId, BookMetadata, ChatSession, Evaluation, MessageDraft, MessageKind, MessageRole,
    Question, QuestionId, Section, SectionId, UserId,
};
use quiz_core::time::fixed_now;
use storage::repository::{
    BookRepository, ChatSessionRepository, SectionRepository, SessionFilter, Storage,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_book(user: UserId, title: &str) -> Book {
    Book::new(
        user,
        title,
        "pdf",
        format!("{user}/{title}_x"),
        BookMetadata::new(12, 2_097_152),
        fixed_now(),
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_books_round_trip_and_find_by_title() {
    let repo = connect("memdb_books").await;
    let user = UserId::new_v4();
    let mut book = build_book(user, "Physics");
    repo.upsert_book(&book).await.unwrap();

    book.set_first_page(3);
    repo.upsert_book(&book).await.unwrap();

    let fetched = repo.get_book(book.id()).await.unwrap().unwrap();
    assert_eq!(fetched, book);
    assert_eq!(fetched.first_page(), Some(3));

    let found = repo.find_book_by_title(user, "Physics").await.unwrap();
    assert_eq!(found.map(|b| b.id()), Some(book.id()));
    assert!(
        repo.find_book_by_title(UserId::new_v4(), "Physics")
            .await
            .unwrap()
            .is_none()
    );

    assert_eq!(repo.list_books(user).await.unwrap().len(), 1);
    assert!(repo.delete_book(book.id()).await.unwrap());
    assert!(!repo.delete_book(book.id()).await.unwrap());
}

#[tokio::test]
async fn sqlite_sections_keep_question_index() {
    let repo = connect("memdb_sections").await;
    let book = BookId::new_v4();

    let mut first =
        Section::new(book, "Forces", 2, 5, 9, Some("F = ma".into()), fixed_now()).unwrap();
    let second = Section::new(book, "Intro", 1, 1, 4, None, fixed_now()).unwrap();
    let question = Question::new("What is inertia?", "general").unwrap();
    first.push_question(question.clone());
    repo.upsert_sections(&[first.clone(), second.clone()])
        .await
        .unwrap();

    let listed = repo.list_sections(book).await.unwrap();
    assert_eq!(
        listed.iter().map(Section::id).collect::<Vec<_>>(),
        vec![second.id(), first.id()]
    );

    let owner = repo
        .find_section_by_question(question.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(owner, first);

    first.remove_question(question.id());
    repo.upsert_section(&first).await.unwrap();
    assert!(
        repo.find_section_by_question(question.id())
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        repo.find_section_by_question(QuestionId::new_v4())
            .await
            .unwrap()
            .is_none()
    );

    assert_eq!(repo.delete_sections_for_book(book).await.unwrap(), 2);
    assert!(repo.get_section(first.id()).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_sessions_filter_and_paginate_newest_first() {
    let repo = connect("memdb_sessions").await;
    let user = UserId::new_v4();
    let book = BookId::new_v4();
    let scoped = SectionId::new_v4();
    let unrelated = SectionId::new_v4();

    let mut ids = Vec::new();
    for day in 0..3 {
        let mut session = ChatSession::new(
            user,
            book,
            vec![scoped, unrelated],
            fixed_now() + Duration::days(day),
        );
        session.append(
            MessageDraft::new(MessageRole::Assistant, MessageKind::Question, "Q?"),
            fixed_now(),
        );
        session.append(
            MessageDraft::new(MessageRole::Assistant, MessageKind::Feedback, "Good")
                .with_evaluation(&Evaluation::new("Good", 8.0)),
            fixed_now(),
        );
        session.finalize(1, fixed_now() + Duration::days(day));
        repo.save_session(&session).await.unwrap();
        ids.push(session.id());
    }
    let elsewhere = ChatSession::new(user, book, vec![unrelated], fixed_now());
    repo.save_session(&elsewhere).await.unwrap();

    let filter = SessionFilter {
        user_id: user,
        book_id: book,
        section_ids: vec![scoped],
    };
    let page = repo.list_sessions(&filter, 2, 0).await.unwrap();
    assert_eq!(
        page.iter().map(ChatSession::id).collect::<Vec<_>>(),
        vec![ids[2], ids[1]]
    );
    assert_eq!(page[0].messages().len(), 2);
    assert_eq!(page[0].overall_score(), Some(8.0));

    let tail = repo.list_sessions(&filter, 2, 2).await.unwrap();
    assert_eq!(tail.len(), 1);

    let none = SessionFilter {
        section_ids: Vec::new(),
        ..filter.clone()
    };
    assert!(repo.list_sessions(&none, 10, 0).await.unwrap().is_empty());

    let fetched = repo.get_session(ids[0]).await.unwrap().unwrap();
    assert_eq!(fetched.section_ids(), &[scoped, unrelated]);
}

#[tokio::test]
async fn sqlite_storage_aggregate_wires_all_repositories() {
    let storage = Storage::sqlite("sqlite:file:memdb_aggregate?mode=memory&cache=shared")
        .await
        .expect("storage");
    let book = build_book(UserId::new_v4(), "Biology");
    storage.books.upsert_book(&book).await.unwrap();
    assert!(storage.books.get_book(book.id()).await.unwrap().is_some());
    assert!(
        storage
            .sections
            .list_sections(book.id())
            .await
            .unwrap()
            .is_empty()
    );
}
