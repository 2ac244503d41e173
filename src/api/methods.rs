//! Typed wrappers for the endpoints the bot itself needs. Each one only
//! fixes an endpoint name and a parameter shape.

use crate::api::client::ApiClient;
use crate::api::params::{InputFile, Parameters};
use crate::error::Result;
use crate::types::{Message, Update, User};

impl ApiClient {
    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", &Parameters::new()).await
    }

    pub async fn get_updates(&self, offset: i64, limit: u32, timeout_secs: u64) -> Result<Vec<Update>> {
        let params = Parameters::new()
            .with("offset", offset)
            .with("limit", limit)
            .with("timeout", timeout_secs as i64);
        self.call("getUpdates", &params).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str, reply_to: Option<i64>) -> Result<Message> {
        let params = Parameters::new()
            .with("chat_id", chat_id)
            .with("text", text)
            .with_opt("reply_to_message_id", reply_to);
        self.call("sendMessage", &params).await
    }

    /// Uploads force a multipart request; file ids and URLs stay form-encoded.
    pub async fn send_photo(&self, chat_id: i64, photo: InputFile, caption: Option<&str>) -> Result<Message> {
        let params = Parameters::new()
            .with("chat_id", chat_id)
            .with("photo", photo)
            .with_opt("caption", caption);
        self.call("sendPhoto", &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "42:TEST_TOKEN_VALUE";

    #[tokio::test]
    async fn test_get_updates_sends_offset_limit_timeout() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", format!("/bot{}/getUpdates", TOKEN).as_str())
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("offset".into(), "15".into()),
                mockito::Matcher::UrlEncoded("limit".into(), "100".into()),
                mockito::Matcher::UrlEncoded("timeout".into(), "60".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"ok": true, "result": [
                    {"update_id": 15, "message": {"message_id": 1, "chat": {"id": 1, "type": "private"}, "text": "hi"}},
                    {"update_id": 16, "edited_message": {}}
                ]}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(TOKEN, &server.url());
        let updates = client.get_updates(15, 100, 60).await.unwrap();

        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].message.as_ref().unwrap().text.as_deref(), Some("hi"));
        assert!(updates[1].message.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_message_omits_missing_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", format!("/bot{}/sendMessage", TOKEN).as_str())
            .match_body("chat_id=5&text=pong")
            .with_status(200)
            .with_body(r#"{"ok": true, "result": {"message_id": 2, "chat": {"id": 5, "type": "private"}, "text": "pong"}}"#)
            .create_async()
            .await;

        let client = ApiClient::new(TOKEN, &server.url());
        let sent = client.send_message(5, "pong", None).await.unwrap();

        assert_eq!(sent.message_id, 2);
        mock.assert_async().await;
    }

    const PHOTO_SENT: &str =
        r#"{"ok": true, "result": {"message_id": 9, "chat": {"id": 5, "type": "private"}, "photo": [{"file_id": "AgADBAAD", "width": 90, "height": 90}]}}"#;

    #[tokio::test]
    async fn test_send_photo_upload_goes_multipart() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", format!("/bot{}/sendPhoto", TOKEN).as_str())
            .match_header(
                "content-type",
                mockito::Matcher::Regex("^multipart/form-data; boundary=".into()),
            )
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::Regex(r#"name="chat_id""#.into()),
                mockito::Matcher::Regex(r#"name="photo"; filename="cat.jpg""#.into()),
                mockito::Matcher::Regex(r#"name="caption""#.into()),
                mockito::Matcher::Regex("JPEGDATA".into()),
            ]))
            .with_status(200)
            .with_body(PHOTO_SENT)
            .create_async()
            .await;

        let client = ApiClient::new(TOKEN, &server.url());
        let photo = InputFile::upload("cat.jpg", b"JPEGDATA".to_vec());
        let sent = client.send_photo(5, photo, Some("meow")).await.unwrap();

        assert_eq!(sent.message_id, 9);
        assert_eq!(sent.photo.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_photo_by_file_id_stays_form_encoded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", format!("/bot{}/sendPhoto", TOKEN).as_str())
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("chat_id".into(), "5".into()),
                mockito::Matcher::UrlEncoded("photo".into(), "AgADBAAD".into()),
            ]))
            .with_status(200)
            .with_body(PHOTO_SENT)
            .create_async()
            .await;

        let client = ApiClient::new(TOKEN, &server.url());
        let sent = client
            .send_photo(5, InputFile::remote("AgADBAAD"), None)
            .await
            .unwrap();

        assert_eq!(sent.message_id, 9);
        mock.assert_async().await;
    }
}
