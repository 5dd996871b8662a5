//! Notification bodies for the OTP and alert messages.

use rust_decimal::Decimal;

use crate::modules::emergency::model::NewAlert;

pub const SMS_MAX_CHARS: usize = 160;

pub const OTP_SUBJECT: &str = "Your SafeTrip verification code";
pub const ALERT_SUBJECT: &str = "EMERGENCY ALERT from SafeTrip";

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

pub fn map_link(latitude: Option<Decimal>, longitude: Option<Decimal>) -> Option<String> {
    match (latitude, longitude) {
        (Some(lat), Some(lng)) => Some(format!("https://www.google.com/maps?q={},{}", lat, lng)),
        _ => None,
    }
}

pub fn otp_email(code: &str, expiry_minutes: i64) -> String {
    format!(
        "<html><body>\
         <h2>SafeTrip verification</h2>\
         <p>Your one-time code is:</p>\
         <p style=\"font-size:24px;font-weight:bold;letter-spacing:4px\">{}</p>\
         <p>The code expires in {} minutes. If you did not request it, ignore this email.</p>\
         </body></html>",
        escape_html(code),
        expiry_minutes
    )
}

pub fn alert_email(alert: &NewAlert) -> String {
    let measure = |value: Option<Decimal>, unit: &str| {
        value
            .map(|v| format!("{} {}", v.normalize(), unit))
            .unwrap_or_else(|| "-".to_string())
    };

    let location = match map_link(alert.latitude, alert.longitude) {
        Some(link) => format!(
            "<p><b>Location:</b> <a href=\"{0}\">{0}</a></p>",
            escape_html(&link)
        ),
        None => "<p><b>Location:</b> not shared</p>".to_string(),
    };

    format!(
        "<html><body>\
         <h2 style=\"color:#c0392b\">Emergency alert</h2>\
         <p><b>Message:</b> {message}</p>\
         <h3>Person</h3>\
         <p><b>Name:</b> {name}<br><b>Email:</b> {email}<br><b>Phone:</b> {phone}</p>\
         <h3>Medical</h3>\
         <p><b>Blood group:</b> {blood}<br><b>Height:</b> {height}<br><b>Weight:</b> {weight}</p>\
         <h3>Where</h3>\
         <p><b>Address:</b> {address}</p>\
         {location}\
         <h3>Emergency contacts</h3>\
         <p><b>Phone:</b> {contact_phone}<br><b>Email:</b> {contact_email}</p>\
         <p style=\"color:#888\">Sent at {sent_at}</p>\
         </body></html>",
        message = escape_html(or_dash(&alert.message)),
        name = escape_html(or_dash(&alert.name)),
        email = escape_html(or_dash(&alert.email)),
        phone = escape_html(or_dash(&alert.phone)),
        blood = escape_html(or_dash(&alert.blood_group)),
        height = measure(alert.height_cm, "cm"),
        weight = measure(alert.weight_kg, "kg"),
        address = escape_html(or_dash(&alert.address)),
        location = location,
        contact_phone = escape_html(or_dash(&alert.emergency_contact_phone)),
        contact_email = escape_html(or_dash(&alert.emergency_email)),
        sent_at = alert.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

/// Short form for SMS, capped at [`SMS_MAX_CHARS`] characters.
pub fn alert_sms(alert: &NewAlert) -> String {
    let mut body = format!("SOS from {}: {}", or_dash(&alert.name), or_dash(&alert.message));
    if let Some(link) = map_link(alert.latitude, alert.longitude) {
        body.push(' ');
        body.push_str(&link);
    } else if !alert.address.trim().is_empty() {
        body.push_str(" @ ");
        body.push_str(alert.address.trim());
    }
    truncate_chars(&body, SMS_MAX_CHARS)
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max - 3).collect();
    cut.push_str("...");
    cut
}
