use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn admin_creates_a_role_and_gets_an_alert() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;

    let res = admin
        .post(
            routes::ROLES,
            &json!({"role_name": "admin", "role_desc": "Administrator role"}),
        )
        .await;

    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["role_name"], "admin");
    assert_eq!(res.body["role_desc"], "Administrator role");
    assert!(res.body["created_at"].is_string());
    let alert = res.alert();
    assert_eq!(alert["type"], "success");
    assert_eq!(alert["source"], "role");
    assert_eq!(res.location(), Some("/roles"));
}

#[tokio::test]
async fn duplicate_role_name_is_a_conflict() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    admin.create_role("editor").await;

    let res = admin
        .post(routes::ROLES, &json!({"role_name": "editor"}))
        .await;

    assert_eq!(res.status, 409);
    assert_eq!(res.body["code"], "CONFLICT");
    assert!(res.body["message"].as_str().unwrap().contains("editor"));
}

#[tokio::test]
async fn mutations_require_a_csrf_token() {
    let app = TestApp::spawn().await;
    let mut admin = app.admin().await;
    admin.forget_csrf();

    let res = admin
        .post(routes::ROLES, &json!({"role_name": "editor"}))
        .await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "CSRF_INVALID");
}

#[tokio::test]
async fn regular_users_cannot_manage_roles() {
    let app = TestApp::spawn().await;
    let (user, _) = app.user("bob@example.com").await;

    let list = user.get(routes::ROLES).await;
    assert_eq!(list.status, 403);
    assert_eq!(list.body["code"], "PERMISSION_DENIED");

    let create = user
        .post(routes::ROLES, &json!({"role_name": "editor"}))
        .await;
    assert_eq!(create.status, 403);
}

#[tokio::test]
async fn update_changes_only_the_given_fields() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let id = admin.create_role("editor").await;

    let res = admin
        .put(&routes::role(&id), &json!({"role_desc": "Edits every page"}))
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["role_name"], "editor");
    assert_eq!(res.body["role_desc"], "Edits every page");

    let cleared = admin
        .put(&routes::role(&id), &json!({"role_desc": null}))
        .await;
    assert_eq!(cleared.status, 200);
    assert!(cleared.body["role_desc"].is_null());
    assert_eq!(cleared.body["role_name"], "editor");
}

#[tokio::test]
async fn invalid_role_name_is_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;

    let res = admin.post(routes::ROLES, &json!({"role_name": "x"})).await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn deleted_role_is_not_found() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let id = admin.create_role("editor").await;

    let res = admin.delete(&routes::role(&id)).await;
    assert_eq!(res.status, 204);
    assert_eq!(res.alert()["message"], "Role deleted");

    let res = admin.get(&routes::role(&id)).await;
    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");

    let again = admin.delete(&routes::role(&id)).await;
    assert_eq!(again.status, 404);
}

#[tokio::test]
async fn list_honours_skip_and_limit() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    for name in ["alpha", "bravo", "charlie", "delta"] {
        admin.create_role(name).await;
    }

    let all = admin.get(routes::ROLES).await;
    assert_eq!(all.status, 200);
    assert_eq!(all.body["roles"].as_array().unwrap().len(), 4);

    let page = admin.get(&format!("{}?skip=1&limit=2", routes::ROLES)).await;
    assert_eq!(page.status, 200);
    assert_eq!(page.body["roles"].as_array().unwrap().len(), 2);
}
