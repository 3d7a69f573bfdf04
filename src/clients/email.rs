use serde::Serialize;
use thiserror::Error;

use crate::models::{Category, Listing, Parish};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("email request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("email provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Message body accepted by the transactional email API
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Clone)]
pub struct EmailClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
    to: Vec<String>,
}

impl EmailClient {
    pub fn new(api_url: String, api_key: Option<String>, from: String, to: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            from,
            to,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some() && !self.to.is_empty()
    }

    /// Notifies the site admins that a listing is waiting for review.
    pub async fn notify_new_listing(
        &self,
        listing: &Listing,
        category: Option<&Category>,
        parish: Option<&Parish>,
    ) -> Result<(), NotifyError> {
        let message = new_listing_email(&self.from, &self.to, listing, category, parish);
        self.send(&message).await
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let Some(api_key) = self.api_key.as_deref().filter(|_| !self.to.is_empty()) else {
            log::info!("Email notifications disabled, skipping '{}'", message.subject);
            return Ok(());
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(message)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }

        log::info!("Sent '{}' to {} recipient(s)", message.subject, message.to.len());
        Ok(())
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Fixed template for the "new listing submitted" admin notification.
pub fn new_listing_email(
    from: &str,
    to: &[String],
    listing: &Listing,
    category: Option<&Category>,
    parish: Option<&Parish>,
) -> EmailMessage {
    let not_provided = "Not provided";
    let fields = [
        ("Business Name", Some(listing.business_name.as_str())),
        ("Category", category.map(|c| c.name.as_str())),
        ("Parish", parish.map(|p| p.name.as_str())),
        ("Phone", listing.phone.as_deref()),
        ("Email", listing.email.as_deref()),
        ("Website", listing.website.as_deref()),
        ("Address", listing.address.as_deref()),
        ("Description", listing.short_description.as_deref()),
    ];

    let rows: String = fields
        .iter()
        .map(|(name, value)| {
            format!(
                "<tr><td style=\"padding:4px 12px 4px 0;font-weight:bold\">{}</td><td>{}</td></tr>",
                name,
                escape_html(value.unwrap_or(not_provided))
            )
        })
        .collect();

    let html = format!(
        "<html><body style=\"font-family:Arial,sans-serif\">\
         <h2>New Listing Submitted</h2>\
         <p>A new business listing is awaiting review.</p>\
         <table>{}</table>\
         <p>Listing ID: {}</p>\
         </body></html>",
        rows, listing.id
    );

    let mut text = String::from("New Listing Submitted\n\nA new business listing is awaiting review.\n\n");
    for (name, value) in &fields {
        text.push_str(&format!("{}: {}\n", name, value.unwrap_or(not_provided)));
    }
    text.push_str(&format!("\nListing ID: {}\n", listing.id));

    EmailMessage {
        from: from.to_string(),
        to: to.to_vec(),
        subject: format!("New listing submitted: {}", listing.business_name),
        html,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateListingRequest, ListingStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn listing(name: &str) -> Listing {
        CreateListingRequest {
            business_name: name.into(),
            category_id: Uuid::new_v4(),
            parish_id: Uuid::new_v4(),
            short_description: Some("Sunset views & <cocktails>".into()),
            description: None,
            phone: Some("+1 268 555 0100".into()),
            email: None,
            website: None,
            address: None,
            latitude: None,
            longitude: None,
            facebook_url: None,
            instagram_url: None,
            google_business_url: None,
            tripadvisor_url: None,
            twitter_url: None,
        }
        .into_new_listing()
        .into_listing()
    }

    fn parish() -> Parish {
        Parish {
            id: Uuid::new_v4(),
            name: "St. Paul".into(),
            slug: "st-paul".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn template_escapes_html_but_not_text() {
        let listing = listing("Shirley's Bar");
        assert_eq!(listing.status, ListingStatus::Pending);
        let message = new_listing_email(
            "noreply@example.com",
            &["admin@example.com".to_string()],
            &listing,
            None,
            Some(&parish()),
        );

        assert_eq!(message.subject, "New listing submitted: Shirley's Bar");
        assert!(message.html.contains("Shirley&#39;s Bar"));
        assert!(message.html.contains("Sunset views &amp; &lt;cocktails&gt;"));
        assert!(message.text.contains("Description: Sunset views & <cocktails>"));
        assert!(message.text.contains("Parish: St. Paul"));
        assert!(message.text.contains("Category: Not provided"));
    }

    #[test]
    fn client_without_key_is_disabled() {
        let client = EmailClient::new(
            "https://api.resend.com/emails/".into(),
            Some("  ".into()),
            "noreply@example.com".into(),
            vec!["admin@example.com".into()],
        );
        assert!(!client.is_enabled());
        assert_eq!(client.api_url, "https://api.resend.com/emails");
    }

    #[tokio::test]
    async fn disabled_client_skips_send() {
        let client = EmailClient::new(
            "http://127.0.0.1:9".into(),
            None,
            "noreply@example.com".into(),
            vec!["admin@example.com".into()],
        );
        let result = client.notify_new_listing(&listing("Big Banana"), None, None).await;
        assert!(result.is_ok());
    }
}
