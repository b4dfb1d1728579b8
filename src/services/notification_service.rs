//! Email notifications. Rendering is synchronous; delivery runs on its own
//! tokio task so the request that triggered it never waits on SMTP.

use std::collections::BTreeMap;
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumString};
use tokio::task::JoinHandle;

use crate::gateways::mailer::{Mailer, OutgoingEmail};
use crate::models::payment::CompletedCheckout;
use crate::models::ticket::TicketRequest;
use crate::utils::error::BestEffort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum EmailTemplate {
    AdminFormSubmission,
    CustomerPaymentConfirmation,
    AdminPaymentNotification,
}

impl EmailTemplate {
    fn subject(self) -> &'static str {
        match self {
            EmailTemplate::AdminFormSubmission => "{{passengerName}} just submitted a ticket request",
            EmailTemplate::CustomerPaymentConfirmation => "Payment Confirmation for Your Booking",
            EmailTemplate::AdminPaymentNotification => "Payment received by {{customer}}",
        }
    }

    fn body(self) -> &'static str {
        match self {
            EmailTemplate::AdminFormSubmission => ADMIN_FORM_SUBMISSION,
            EmailTemplate::CustomerPaymentConfirmation => CUSTOMER_PAYMENT_CONFIRMATION,
            EmailTemplate::AdminPaymentNotification => ADMIN_PAYMENT_NOTIFICATION,
        }
    }

    /// Renders subject (plain text) and body (HTML, values escaped).
    pub fn render(self, context: &EmailContext) -> (String, String) {
        (render(self.subject(), context, false), render(self.body(), context, true))
    }
}

/// Flat key/value data a template is rendered against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailContext(BTreeMap<String, String>);

impl EmailContext {
    pub fn new() -> Self {
        EmailContext::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

fn render(template: &str, context: &EmailContext, escape: bool) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let value = context.get(after[..end].trim()).unwrap_or("");
                if escape {
                    out.push_str(&escape_html(value));
                } else {
                    out.push_str(value);
                }
                rest = &after[end + 2..];
            }
            None => {
                // Unterminated placeholder is emitted verbatim
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Handle on a spawned delivery. Dropping it leaves the delivery running.
#[derive(Debug)]
pub struct Notification {
    template: EmailTemplate,
    handle: JoinHandle<BestEffort<()>>,
}

impl Notification {
    pub fn template(&self) -> EmailTemplate {
        self.template
    }

    pub async fn outcome(self) -> BestEffort<()> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => BestEffort::Failed(format!("notification task aborted: {err}")),
        }
    }
}

pub struct NotificationService {
    mailer: Arc<dyn Mailer>,
    admin_email: String,
}

impl NotificationService {
    pub fn new(mailer: Arc<dyn Mailer>, admin_email: String) -> Self {
        NotificationService { mailer, admin_email }
    }

    pub fn dispatch(&self, template: EmailTemplate, recipient: Option<&str>, context: EmailContext) -> Notification {
        let recipient = recipient.map(str::trim).filter(|r| !r.is_empty()).map(String::from);
        let (subject, html_body) = template.render(&context);
        let mailer = Arc::clone(&self.mailer);

        let handle = tokio::spawn(async move {
            let Some(to) = recipient else {
                tracing::debug!(%template, "no recipient, email skipped");
                return BestEffort::Skipped;
            };

            let email = OutgoingEmail { to, subject, html_body };
            match mailer.send(&email).await {
                Ok(()) => {
                    tracing::info!(%template, to = %email.to, "email sent");
                    BestEffort::Completed(())
                }
                Err(err) => {
                    tracing::warn!(%template, to = %email.to, error = %err, "email delivery failed");
                    BestEffort::Failed(err.to_string())
                }
            }
        });

        Notification { template, handle }
    }

    pub fn admin_form_submission(&self, ticket: &TicketRequest) -> Notification {
        let submission = &ticket.submission;
        let passengers = submission
            .passengers
            .iter()
            .map(|p| format!("{} {}", p.title, p.full_name()).trim().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let availability = if submission.ticket_availability.immediate { "Immediate" } else { "Later" };

        let context = EmailContext::new()
            .with("sessionId", ticket.session_id.to_string())
            .with("passengerName", submission.lead_passenger_name())
            .with("type", submission.trip_type.to_string())
            .with("submittedOn", ticket.created_at.format("%Y-%m-%d %H:%M UTC").to_string())
            .with("ticketCount", submission.quantity.total().to_string())
            .with("passengers", passengers)
            .with("number", format!("{}{}", submission.phone_number.code, submission.phone_number.digits))
            .with("email", submission.email.as_str())
            .with("from", submission.from.as_str())
            .with("to", submission.to.as_str())
            .with("departureDate", submission.departure_date.to_string())
            .with(
                "departureFlight",
                submission.flight_details.departure_flight.as_ref().map(|f| f.summary()).unwrap_or_default(),
            )
            .with(
                "returnDate",
                submission.return_date.map(|d| d.to_string()).unwrap_or_else(|| "Not Specified".into()),
            )
            .with(
                "returnFlight",
                submission.flight_details.return_flight.as_ref().map(|f| f.summary()).unwrap_or_default(),
            )
            .with("ticketValidity", submission.ticket_validity.to_string())
            .with("ticketAvailability", availability)
            .with(
                "ticketAvailabilityDate",
                submission.ticket_availability.receipt_date.clone().unwrap_or_default(),
            )
            .with("message", submission.message.clone().unwrap_or_default());

        self.dispatch(EmailTemplate::AdminFormSubmission, Some(&self.admin_email), context)
    }

    /// Customer confirmation plus admin notice, built from the checkout metadata alone.
    pub fn payment_confirmations(&self, checkout: &CompletedCheckout) -> Vec<Notification> {
        let meta = &checkout.metadata;
        let or_unknown = |value: &Option<String>| {
            value.clone().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| "Unknown".to_string())
        };
        let minor = checkout.amount_total;
        let amount = format!("{}.{:02}", minor / 100, minor % 100);

        let context = EmailContext::new()
            .with("customer", meta.customer.as_str())
            .with("email", checkout.customer_email.clone().unwrap_or_default())
            .with("ticketType", or_unknown(&meta.ticket_type))
            .with("departureCity", or_unknown(&meta.departure_city))
            .with("arrivalCity", or_unknown(&meta.arrival_city))
            .with("departureDate", or_unknown(&meta.departure_date))
            .with(
                "returnDate",
                meta.return_date
                    .clone()
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| "Not Specified".to_string()),
            )
            .with("currency", checkout.currency.to_uppercase())
            .with("amount", amount);

        vec![
            self.dispatch(
                EmailTemplate::CustomerPaymentConfirmation,
                checkout.customer_email.as_deref(),
                context.clone(),
            ),
            self.dispatch(EmailTemplate::AdminPaymentNotification, Some(&self.admin_email), context),
        ]
    }
}

const ADMIN_FORM_SUBMISSION: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="color: #2563eb;">New ticket request</h2>
    <table cellpadding="4">
      <tr><td><b>Session</b></td><td>{{sessionId}}</td></tr>
      <tr><td><b>Type</b></td><td>{{type}}</td></tr>
      <tr><td><b>Submitted on</b></td><td>{{submittedOn}}</td></tr>
      <tr><td><b>Tickets</b></td><td>{{ticketCount}}</td></tr>
      <tr><td><b>Passengers</b></td><td>{{passengers}}</td></tr>
      <tr><td><b>Phone</b></td><td>{{number}}</td></tr>
      <tr><td><b>Email</b></td><td>{{email}}</td></tr>
      <tr><td><b>Route</b></td><td>{{from}} &rarr; {{to}}</td></tr>
      <tr><td><b>Departure</b></td><td>{{departureDate}}<br>{{departureFlight}}</td></tr>
      <tr><td><b>Return</b></td><td>{{returnDate}}<br>{{returnFlight}}</td></tr>
      <tr><td><b>Validity</b></td><td>{{ticketValidity}}</td></tr>
      <tr><td><b>Availability</b></td><td>{{ticketAvailability}} {{ticketAvailabilityDate}}</td></tr>
      <tr><td><b>Message</b></td><td>{{message}}</td></tr>
    </table>
  </div>
</body>
</html>
"#;

const CUSTOMER_PAYMENT_CONFIRMATION: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="color: #16a34a;">Thank you, {{customer}}!</h2>
    <p>We have received your payment of <b>{{amount}} {{currency}}</b>.</p>
    <p>Your {{ticketType}} ticket from {{departureCity}} to {{arrivalCity}} departing on
       {{departureDate}} (return: {{returnDate}}) is now being processed.</p>
    <p style="color: #666; font-size: 14px;">A confirmation was sent to {{email}}.</p>
  </div>
</body>
</html>
"#;

const ADMIN_PAYMENT_NOTIFICATION: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="color: #2563eb;">Payment received</h2>
    <table cellpadding="4">
      <tr><td><b>Customer</b></td><td>{{customer}} ({{email}})</td></tr>
      <tr><td><b>Ticket type</b></td><td>{{ticketType}}</td></tr>
      <tr><td><b>Route</b></td><td>{{departureCity}} &rarr; {{arrivalCity}}</td></tr>
      <tr><td><b>Departure</b></td><td>{{departureDate}}</td></tr>
      <tr><td><b>Return</b></td><td>{{returnDate}}</td></tr>
      <tr><td><b>Amount</b></td><td>{{amount}} {{currency}}</td></tr>
    </table>
  </div>
</body>
</html>
"#;
