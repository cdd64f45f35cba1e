use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

use admin_server::entity::user_group_link;

use crate::common::{TestApp, routes};

fn member_ids(body: &serde_json::Value) -> Vec<String> {
    let mut ids: Vec<String> = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn second_group_with_the_same_name_is_a_conflict() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    admin.create_group("finance").await;

    let res = admin
        .post(routes::GROUPS, &json!({"group_name": "finance"}))
        .await;

    assert_eq!(res.status, 409);
    assert_eq!(res.body["code"], "CONFLICT");
}

#[tokio::test]
async fn unknown_permission_is_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;

    let res = admin
        .post(
            routes::GROUPS,
            &json!({"group_name": "finance", "permission": "superpower"}),
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn member_set_follows_each_selection() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let group = admin.create_group("finance").await;
    let alice = app.register("alice@example.com").await;
    let bob = app.register("bob@example.com").await;

    let res = admin
        .put(
            &routes::group_members(&group),
            &json!({"user_ids": [alice, bob]}),
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["added"].as_array().unwrap().len(), 2);
    assert_eq!(res.alert()["message"], "Members updated: 2 added, 0 removed");

    let detail = admin.get(&routes::group(&group)).await;
    let mut expected = vec![alice.clone(), bob.clone()];
    expected.sort();
    assert_eq!(member_ids(&detail.body), expected);

    let res = admin
        .put(&routes::group_members(&group), &json!({"user_ids": [bob]}))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["removed"], json!([alice]));
    assert_eq!(res.body["added"], json!([]));

    let detail = admin.get(&routes::group(&group)).await;
    assert_eq!(member_ids(&detail.body), vec![bob]);
}

#[tokio::test]
async fn unknown_member_leaves_membership_untouched() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let group = admin.create_group("finance").await;
    let alice = app.register("alice@example.com").await;
    admin
        .put(&routes::group_members(&group), &json!({"user_ids": [alice]}))
        .await;

    let res = admin
        .put(
            &routes::group_members(&group),
            &json!({"user_ids": [uuid::Uuid::new_v4()]}),
        )
        .await;
    assert_eq!(res.status, 404);

    let detail = admin.get(&routes::group(&group)).await;
    assert_eq!(member_ids(&detail.body), vec![alice]);
}

#[tokio::test]
async fn duplicate_selection_is_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let group = admin.create_group("finance").await;
    let alice = app.register("alice@example.com").await;

    let res = admin
        .put(
            &routes::group_members(&group),
            &json!({"user_ids": [alice, alice]}),
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn list_includes_members() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let finance = admin.create_group("finance").await;
    admin.create_group("support").await;
    let alice = app.register("alice@example.com").await;
    admin
        .put(&routes::group_members(&finance), &json!({"user_ids": [alice]}))
        .await;

    let res = admin.get(routes::GROUPS).await;
    assert_eq!(res.status, 200);
    let groups = res.body["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    for group in groups {
        let expected = if group["id"] == finance.as_str() { 1 } else { 0 };
        assert_eq!(group["users"].as_array().unwrap().len(), expected);
    }
}

#[tokio::test]
async fn deleting_a_group_removes_its_links() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let group = admin.create_group("finance").await;
    let alice = app.register("alice@example.com").await;
    admin
        .put(&routes::group_members(&group), &json!({"user_ids": [alice]}))
        .await;

    let res = admin.delete(&routes::group(&group)).await;
    assert_eq!(res.status, 204);
    assert_eq!(res.location(), Some("/groups"));

    let links = user_group_link::Entity::find().count(&app.db).await.unwrap();
    assert_eq!(links, 0);
}

#[tokio::test]
async fn update_can_clear_the_permission() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let group = admin.create_group("finance").await;

    let res = admin
        .put(&routes::group(&group), &json!({"permission": null}))
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert!(res.body["permission"].is_null());
    assert_eq!(res.body["group_name"], "finance");
}

#[tokio::test]
async fn markup_in_group_text_is_stripped() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;

    let res = admin
        .post(
            routes::GROUPS,
            &json!({
                "group_name": "<script>alert(1)</script>finance",
                "group_desc": "Books <script>x</script>and ledgers",
            }),
        )
        .await;

    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["group_name"], "finance");
    assert_eq!(res.body["group_desc"], "Books and ledgers");
    let message = res.alert()["message"].as_str().unwrap().to_string();
    assert!(!message.contains("<script"), "{message}");
}
