use serde_json::json;

use crate::common::{ADMIN_EMAIL, PASSWORD, TestApp, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn new_user_can_register_with_valid_credentials() {
        let app = TestApp::spawn().await;

        let res = app
            .session()
            .post(
                routes::REGISTER,
                &json!({"email": "Alice@Example.com", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(uuid::Uuid::parse_str(res.body["id"].as_str().unwrap()).is_ok());
        assert_eq!(res.body["email"], "alice@example.com");
    }

    #[tokio::test]
    async fn cannot_register_with_an_already_taken_email() {
        let app = TestApp::spawn().await;
        let body = json!({"email": "alice@example.com", "password": PASSWORD});

        let first = app.session().post(routes::REGISTER, &body).await;
        assert_eq!(first.status, 201, "First registration failed: {}", first.text);

        let res = app.session().post(routes::REGISTER, &body).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn cannot_register_with_a_password_that_is_too_short() {
        let app = TestApp::spawn().await;

        let res = app
            .session()
            .post(
                routes::REGISTER,
                &json!({"email": "alice@example.com", "password": "  short  "}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn password_with_surrounding_spaces_logs_in_as_typed() {
        let app = TestApp::spawn().await;
        let password = "  longpassword  ";

        let res = app
            .session()
            .post(
                routes::REGISTER,
                &json!({"email": "alice@example.com", "password": password}),
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);

        let res = app.session().login("alice@example.com", password).await;
        assert_eq!(res.status, 204, "{}", res.text);

        let res = app.session().login("alice@example.com", "longpassword").await;
        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn cannot_register_with_a_malformed_email() {
        let app = TestApp::spawn().await;

        let res = app
            .session()
            .post(
                routes::REGISTER,
                &json!({"email": "not-an-email", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn login_sets_a_cookie_that_authenticates_later_requests() {
        let app = TestApp::spawn().await;
        app.register("bob@example.com").await;
        let session = app.session();

        let res = session.login("bob@example.com", PASSWORD).await;
        assert_eq!(res.status, 204, "{}", res.text);
        let set_cookie = res.headers["set-cookie"].to_str().unwrap();
        assert!(set_cookie.starts_with("adminauth="));
        assert!(set_cookie.contains("HttpOnly"));

        let me = session.get(routes::ME).await;
        assert_eq!(me.status, 200, "{}", me.text);
        assert_eq!(me.body["email"], "bob@example.com");
        assert_eq!(me.body["is_superuser"], false);
    }

    #[tokio::test]
    async fn seeded_superuser_can_log_in() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;

        let me = admin.get(routes::ME).await;
        assert_eq!(me.status, 200);
        assert_eq!(me.body["email"], ADMIN_EMAIL);
        assert_eq!(me.body["is_superuser"], true);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = TestApp::spawn().await;
        app.register("bob@example.com").await;

        let res = app
            .session()
            .login("bob@example.com", "wrong-password")
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn unknown_email_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.session().login("ghost@example.com", PASSWORD).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn deactivated_user_cannot_log_in() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let id = app.register("bob@example.com").await;

        let res = admin
            .put(&routes::user(&id), &json!({"is_active": false}))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.session().login("bob@example.com", PASSWORD).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }
}

mod session {
    use super::*;

    #[tokio::test]
    async fn me_without_credentials_is_token_missing() {
        let app = TestApp::spawn().await;

        let res = app.session().get(routes::ME).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn garbage_bearer_token_is_token_invalid() {
        let app = TestApp::spawn().await;

        let res = app
            .session()
            .get_with_bearer(routes::ME, "not.a.jwt")
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn deactivation_ends_an_open_session() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (bob, bob_id) = app.user("bob@example.com").await;
        assert_eq!(bob.get(routes::ME).await.status, 200);

        let res = admin
            .put(&routes::user(&bob_id), &json!({"is_active": false}))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let me = bob.get(routes::ME).await;
        assert_eq!(me.status, 401);
        assert_eq!(me.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn superuser_flag_is_read_from_the_account() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (bob, bob_id) = app.user("bob@example.com").await;
        assert_eq!(bob.get(routes::ROLES).await.status, 403);

        admin
            .put(&routes::user(&bob_id), &json!({"is_superuser": true}))
            .await;
        assert_eq!(bob.get(routes::ROLES).await.status, 200);

        admin
            .put(&routes::user(&bob_id), &json!({"is_superuser": false}))
            .await;
        let res = bob.get(routes::ROLES).await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn deleted_account_token_is_invalid() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (bob, bob_id) = app.user("bob@example.com").await;

        let res = admin.delete(&routes::user(&bob_id)).await;
        assert_eq!(res.status, 204);

        let me = bob.get(routes::ME).await;
        assert_eq!(me.status, 401);
        assert_eq!(me.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn logout_clears_the_cookie() {
        let app = TestApp::spawn().await;
        let (session, _) = app.user("bob@example.com").await;

        let res = session.post(routes::LOGOUT, &json!({})).await;
        assert_eq!(res.status, 204, "{}", res.text);

        let me = session.get(routes::ME).await;
        assert_eq!(me.status, 401);
        assert_eq!(me.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn csrf_endpoint_returns_token_and_cookie() {
        let app = TestApp::spawn().await;

        let res = app.session().get(routes::CSRF).await;

        assert_eq!(res.status, 200);
        let token = res.body["csrf_token"].as_str().unwrap();
        assert_eq!(token.len(), 64);
        let set_cookie = res.headers["set-cookie"].to_str().unwrap();
        assert!(set_cookie.starts_with(&format!("csrftoken={token}")));
    }
}
