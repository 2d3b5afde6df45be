use serde_json::json;
use verse_cli::bible::{BibleClient, Translation, VerseError, VerseQuery};
use verse_cli::session::{ChatRole, Session};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn kjv_query(book: &str, reference: &str) -> VerseQuery {
    VerseQuery {
        book: book.to_string(),
        reference: reference.to_string(),
        translation: Translation::Kjv,
    }
}

#[tokio::test]
async fn fetches_a_single_verse() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Jeremiah+29:11"))
        .and(query_param("translation", "kjv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reference": "Jeremiah 29:11",
            "verses": [{
                "book_id": "JER",
                "book_name": "Jeremiah",
                "chapter": 29,
                "verse": 11,
                "text": "For I know the thoughts that I think toward you, saith the LORD, thoughts of peace, and not of evil, to give you an expected end.\n"
            }],
            "translation_id": "kjv",
            "translation_name": "King James Version"
        })))
        .mount(&server)
        .await;

    let client = BibleClient::new(&server.uri());
    let result = client.fetch_verse(&kjv_query("Jeremiah", "29:11")).await.unwrap();

    assert_eq!(result.reference, "Jeremiah 29:11");
    assert_eq!(result.verses.len(), 1);
    assert_eq!(result.verses[0].verse, 11);
    assert!(result.verses[0].text.starts_with("For I know"));
}

#[tokio::test]
async fn keeps_verses_in_upstream_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Philippians+4:6-7"))
        .and(query_param("translation", "web"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reference": "Philippians 4:6-7",
            "verses": [
                {"verse": 6, "text": "In nothing be anxious...\n"},
                {"verse": 7, "text": "And the peace of God...\n"}
            ]
        })))
        .mount(&server)
        .await;

    let client = BibleClient::new(&server.uri());
    let query = VerseQuery {
        book: "Philippians".to_string(),
        reference: "4:6-7".to_string(),
        translation: Translation::Web,
    };
    let result = client.fetch_verse(&query).await.unwrap();

    assert!(!result.verses.is_empty());
    let numbers: Vec<u32> = result.verses.iter().map(|v| v.verse).collect();
    assert_eq!(numbers, vec![6, 7]);
}

#[tokio::test]
async fn unknown_book_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "not found"
        })))
        .mount(&server)
        .await;

    let client = BibleClient::new(&server.uri());
    let err = client.fetch_verse(&kjv_query("NotABook", "1:1")).await.unwrap_err();
    assert!(matches!(err, VerseError::NotFound));
}

#[tokio::test]
async fn server_error_is_classified_with_its_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = BibleClient::new(&server.uri());
    let err = client.fetch_verse(&kjv_query("Jeremiah", "29:11")).await.unwrap_err();
    assert!(matches!(err, VerseError::Unexpected(500)));
}

#[tokio::test]
async fn ok_status_with_unparseable_body_fails_closed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "this is not passage data"
        })))
        .mount(&server)
        .await;

    let client = BibleClient::new(&server.uri());
    let err = client.fetch_verse(&kjv_query("Jeremiah", "29:11")).await.unwrap_err();
    assert!(matches!(err, VerseError::Malformed));
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    // Nothing listens on port 1
    let client = BibleClient::new("http://127.0.0.1:1");
    let err = client.fetch_verse(&kjv_query("Jeremiah", "29:11")).await.unwrap_err();
    assert!(matches!(err, VerseError::Transport(_)));
}

#[tokio::test]
async fn lookup_then_chat_injects_the_stored_passage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Jeremiah+29:11"))
        .and(query_param("translation", "kjv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reference": "Jeremiah 29:11",
            "verses": [{"verse": 11, "text": "For I know the thoughts that I think toward you...\n"}]
        })))
        .mount(&server)
        .await;

    let client = BibleClient::new(&server.uri());
    let mut session = Session::new();
    let history_len = session.messages.len();

    let result = client.fetch_verse(&kjv_query("Jeremiah", "29:11")).await.unwrap();
    session.store_verse(result);
    session.push_user("what does this mean");

    let outbound = session.outbound_messages();
    // inserted context + user turn on top of the prior history
    assert_eq!(outbound.len(), history_len + 2);
    assert_eq!(outbound[1].role, ChatRole::System);
    assert!(outbound[1].content.contains("Jeremiah 29:11"));
    assert!(outbound[1].content.contains("11. For I know"));
}
