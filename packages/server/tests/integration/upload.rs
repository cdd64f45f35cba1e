use crate::common::{TestApp, routes};

#[tokio::test]
async fn upload_requires_login() {
    let app = TestApp::spawn().await;

    let res = app
        .session()
        .upload("notes.txt", b"hello".to_vec(), "text/plain", None)
        .await;

    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "TOKEN_MISSING");
}

#[tokio::test]
async fn upload_without_csrf_token_is_forbidden() {
    let app = TestApp::spawn().await;
    let (mut bob, _) = app.user("bob@example.com").await;
    bob.forget_csrf();

    let res = bob
        .upload("notes.txt", b"hello".to_vec(), "text/plain", None)
        .await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "CSRF_INVALID");
}

#[tokio::test]
async fn uploaded_file_is_stored_under_a_generated_key() {
    let app = TestApp::spawn().await;
    let (bob, bob_id) = app.user("bob@example.com").await;

    let res = bob
        .upload("Notes.TXT", b"hello world".to_vec(), "text/plain", Some("avatar"))
        .await;

    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["name"], "Notes.TXT");
    assert_eq!(res.body["source"], "avatar");
    assert_eq!(res.body["file_type"], "text/plain");
    assert_eq!(res.body["file_size"], 11);
    assert_eq!(res.body["user_id"], bob_id.as_str());
    let key = res.body["unique_name"].as_str().unwrap();
    assert!(key.ends_with(".txt"));
    assert_eq!(std::fs::read(app.stored_file(key)).unwrap(), b"hello world");
}

#[tokio::test]
async fn source_defaults_to_upload() {
    let app = TestApp::spawn().await;
    let (bob, _) = app.user("bob@example.com").await;

    let res = bob
        .upload("data.bin", vec![1, 2, 3], "application/octet-stream", None)
        .await;

    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["source"], "upload");
}

#[tokio::test]
async fn empty_file_is_rejected() {
    let app = TestApp::spawn().await;
    let (bob, _) = app.user("bob@example.com").await;

    let res = bob.upload("empty.txt", Vec::new(), "text/plain", None).await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn list_shows_only_own_uploads() {
    let app = TestApp::spawn().await;
    let (bob, _) = app.user("bob@example.com").await;
    let (carol, _) = app.user("carol@example.com").await;
    bob.upload("one.txt", b"1".to_vec(), "text/plain", None).await;
    bob.upload("two.txt", b"2".to_vec(), "text/plain", None).await;
    carol.upload("three.txt", b"3".to_vec(), "text/plain", None).await;

    let res = bob.get(routes::UPLOADS).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["total"], 2);
    let names: Vec<&str> = res.body["uploads"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"one.txt") && names.contains(&"two.txt"));
}

#[tokio::test]
async fn owner_downloads_and_others_do_not() {
    let app = TestApp::spawn().await;
    let (bob, _) = app.user("bob@example.com").await;
    let (carol, _) = app.user("carol@example.com").await;
    let id = bob
        .upload("report.csv", b"a,b\n1,2\n".to_vec(), "text/csv", None)
        .await
        .id();

    let (status, headers, bytes) = bob.get_bytes(&routes::upload_download(&id)).await;
    assert_eq!(status, 200);
    assert_eq!(bytes, b"a,b\n1,2\n");
    assert_eq!(headers["content-type"], "text/csv");
    assert!(
        headers["content-disposition"]
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"report.csv\"")
    );

    let (status, _, _) = carol.get_bytes(&routes::upload_download(&id)).await;
    assert_eq!(status, 404);

    let admin = app.admin().await;
    let (status, _, _) = admin.get_bytes(&routes::upload_download(&id)).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn delete_removes_row_and_file() {
    let app = TestApp::spawn().await;
    let (bob, _) = app.user("bob@example.com").await;
    let res = bob
        .upload("notes.txt", b"bye".to_vec(), "text/plain", None)
        .await;
    let id = res.id();
    let key = res.body["unique_name"].as_str().unwrap().to_string();

    let res = bob.delete(&routes::upload(&id)).await;
    assert_eq!(res.status, 204);
    assert!(!app.stored_file(&key).exists());

    let res = bob.get(&routes::upload_download(&id)).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn deleting_a_user_removes_their_files() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let (bob, bob_id) = app.user("bob@example.com").await;
    let res = bob
        .upload("notes.txt", b"bye".to_vec(), "text/plain", None)
        .await;
    let key = res.body["unique_name"].as_str().unwrap().to_string();

    let res = admin.delete(&routes::user(&bob_id)).await;
    assert_eq!(res.status, 204);
    assert!(!app.stored_file(&key).exists());
}

#[tokio::test]
async fn total_counts_every_upload_not_just_the_page() {
    let app = TestApp::spawn().await;
    let (bob, _) = app.user("bob@example.com").await;
    for name in ["one.txt", "two.txt", "three.txt"] {
        let res = bob.upload(name, b"x".to_vec(), "text/plain", None).await;
        assert_eq!(res.status, 201, "{}", res.text);
    }

    let res = bob.get(&format!("{}?limit=2", routes::UPLOADS)).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["uploads"].as_array().unwrap().len(), 2);
    assert_eq!(res.body["total"], 3);
}
