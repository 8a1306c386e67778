//! Email service module for handling email-related functionality.
//!
//! Sends check-in OTP emails over SMTP, configured for Gmail via the
//! `lettre` crate. Both plain text and HTML bodies are included.
//!
//! # Configuration
//! - `GMAIL_USERNAME`: Gmail address to send emails from
//! - `GMAIL_APP_PASSWORD`: Gmail app password for authentication
//! - `EMAIL_FROM_NAME`: Display name for the sender

use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{
    AsyncTransport, Tokio1Executor,
    message::{Message, MultiPart, SinglePart, header},
    transport::smtp::{AsyncSmtpTransport, authentication::Credentials},
};
use once_cell::sync::Lazy;
use util::config;

type EmailError = Box<dyn std::error::Error + Send + Sync>;

/// Global SMTP client instance configured for Gmail.
///
/// Initialized lazily on the first send; development deployments that rely on
/// the OTP echo never build it.
static SMTP_CLIENT: Lazy<AsyncSmtpTransport<Tokio1Executor>> = Lazy::new(|| {
    let tls_parameters = TlsParameters::new("smtp.gmail.com".to_string())
        .expect("Failed to create TLS parameters");

    AsyncSmtpTransport::<Tokio1Executor>::relay("smtp.gmail.com")
        .expect("Failed to create SMTP transport")
        .port(587)
        .tls(Tls::Required(tls_parameters))
        .credentials(Credentials::new(
            config::gmail_username(),
            config::gmail_app_password(),
        ))
        .build()
});

/// Service for handling email-related operations.
pub struct EmailService;

impl EmailService {
    /// Sends a check-in OTP to the student. The caller decides whether a
    /// failure here is fatal; the OTP is already durable in the database.
    pub async fn send_otp_email(
        to_email: &str,
        otp_code: &str,
        expiry_minutes: i64,
    ) -> Result<(), EmailError> {
        let from_email = config::gmail_username();
        if from_email.is_empty() || config::gmail_app_password().is_empty() {
            return Err("email credentials are not configured".into());
        }
        let from_name = config::email_from_name();

        let email = Message::builder()
            .from(format!("{} <{}>", from_name, from_email).parse()?)
            .to(to_email.parse()?)
            .subject("Your Attendance Check-in Code")
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(format!(
                                "Hello,\n\n\
                                Your one-time code for marking attendance is:\n\n\
                                {}\n\n\
                                This code will expire in {} minutes and can only be used once.\n\n\
                                If you did not request this code, please ignore this email.\n\n\
                                Best regards,\n\
                                {}",
                                otp_code, expiry_minutes, from_name
                            )),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<!DOCTYPE html>
                                <html>
                                <head>
                                    <style>
                                        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
                                        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; text-align: center; }}
                                        .code {{
                                            display: inline-block;
                                            padding: 10px 20px;
                                            background-color: #f4f4f4;
                                            border-radius: 5px;
                                            margin: 20px 0;
                                            font-size: 28px;
                                            font-weight: bold;
                                            letter-spacing: 6px;
                                        }}
                                        .warning {{ color: #dc3545; }}
                                    </style>
                                </head>
                                <body>
                                    <div class="container">
                                        <h2>Attendance Check-in</h2>
                                        <p>Hello,</p>
                                        <p>Your one-time code for marking attendance is:</p>
                                        <div class="code">{}</div>
                                        <p>This code will expire in {} minutes and can only be used once.</p>
                                        <p class="warning">If you did not request this code, please ignore this email.</p>
                                        <p>Best regards,<br>{}</p>
                                    </div>
                                </body>
                                </html>"#,
                                otp_code, expiry_minutes, from_name
                            )),
                    ),
            )?;

        SMTP_CLIENT.send(email).await?;
        Ok(())
    }
}
