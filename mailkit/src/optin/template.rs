//! Confirmation email content.

pub const CONFIRM_SUBJECT: &str = "Confirm your subscription";

/// Heading shown at the top of the confirmation email.
pub fn greeting(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => format!("Welcome, {}!", name),
        _ => "Welcome!".to_string(),
    }
}

/// HTML body with a single "Confirm Subscription" button.
///
/// Clicking the button is what produces the `email.clicked` event that
/// confirms the contact, so the link itself only needs to land somewhere
/// sensible.
pub fn confirmation_html(name: Option<&str>, confirm_url: &str) -> String {
    let greeting = htmlescape::encode_minimal(&greeting(name));
    let confirm_url = htmlescape::encode_minimal(confirm_url);

    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; margin: 0; padding: 0; background-color: #f4f4f5;">
  <div style="text-align: center; padding: 40px 20px;">
    <h1 style="color: #18181b; margin-bottom: 16px;">{greeting}</h1>
    <p style="color: #52525b; font-size: 16px; margin-bottom: 32px;">Please confirm your subscription to our newsletter.</p>
    <a href="{confirm_url}" style="background-color: #18181b; color: #ffffff; padding: 12px 32px; border-radius: 6px; text-decoration: none; font-weight: bold; display: inline-block;">Confirm Subscription</a>
    <p style="color: #a1a1aa; font-size: 12px; margin-top: 32px;">If you didn't request this, you can safely ignore this email.</p>
  </div>
</body>
</html>"#
    )
}

/// Plain-text alternative for clients that do not render HTML.
pub fn confirmation_text(name: Option<&str>, confirm_url: &str) -> String {
    format!(
        "{}\n\nPlease confirm your subscription to our newsletter:\n{}\n\nIf you didn't request this, you can safely ignore this email.\n",
        greeting(name),
        confirm_url
    )
}
