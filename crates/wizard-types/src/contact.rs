//! Contact details, OTP channel selection and authentication progress.

use serde::{Deserialize, Serialize};

/// Number of digits in a one-time passcode.
pub const OTP_LENGTH: usize = 6;

/// Delivery channel for a one-time passcode. At most one channel is chosen
/// at a time; choosing a channel replaces any earlier choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpChannel {
	Sms,
	Email,
}

impl OtpChannel {
	/// Returns the stable slug for this channel.
	pub fn as_str(&self) -> &'static str {
		match self {
			OtpChannel::Sms => "sms",
			OtpChannel::Email => "email",
		}
	}
}

/// Contact details collected from the guest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub mobile_number: Option<String>,
}

/// Guest verification progress.
///
/// `authenticated` only moves from false to true during a session; nothing
/// but a reset returns it to false.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthProgress {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub channel: Option<OtpChannel>,
	/// Masked form of the destination the code was sent to, for display.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub masked_destination: Option<String>,
	/// Digits typed so far, at most [`OTP_LENGTH`].
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub code_input: String,
	#[serde(default)]
	pub authenticated: bool,
}

impl AuthProgress {
	/// Whether the typed code is complete and ready to submit.
	pub fn code_complete(&self) -> bool {
		self.code_input.len() == OTP_LENGTH
	}
}

/// Masks a phone number for display, keeping only the last four digits.
pub fn mask_phone(number: &str) -> String {
	let digits: Vec<char> = number.chars().filter(|c| c.is_ascii_digit()).collect();
	if digits.len() <= 4 {
		return "••••".to_string();
	}
	let tail: String = digits[digits.len() - 4..].iter().collect();
	format!("•••• {}", tail)
}

/// Masks an email address for display, keeping the first character of the
/// local part and the full domain.
pub fn mask_email(address: &str) -> String {
	match address.split_once('@') {
		Some((local, domain)) if !local.is_empty() => {
			let first = local.chars().next().unwrap_or('•');
			format!("{}•••@{}", first, domain)
		}
		_ => "•••".to_string(),
	}
}

/// Lightweight format check for an email address.
///
/// This is local input sanity, not deliverability: a non-empty local part
/// and a domain containing a dot.
pub fn looks_like_email(address: &str) -> bool {
	match address.split_once('@') {
		Some((local, domain)) => {
			!local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
		}
		None => false,
	}
}

/// Lightweight format check for a mobile number: an optional leading `+`
/// followed by 7 to 15 digits, ignoring spaces and dashes.
pub fn looks_like_mobile(number: &str) -> bool {
	let trimmed = number.trim();
	let rest = trimmed.strip_prefix('+').unwrap_or(trimmed);
	let mut digits = 0usize;
	for c in rest.chars() {
		match c {
			'0'..='9' => digits += 1,
			' ' | '-' => {}
			_ => return false,
		}
	}
	(7..=15).contains(&digits)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn phone_masking_keeps_last_four_digits() {
		assert_eq!(mask_phone("+1 555 123 0123"), "•••• 0123");
		assert_eq!(mask_phone("123"), "••••");
	}

	#[test]
	fn email_masking_keeps_first_char_and_domain() {
		assert_eq!(mask_email("jordan@example.com"), "j•••@example.com");
		assert_eq!(mask_email("not-an-email"), "•••");
	}

	#[test]
	fn email_format_check() {
		assert!(looks_like_email("a@example.com"));
		assert!(!looks_like_email("a@nodot"));
		assert!(!looks_like_email("@example.com"));
		assert!(!looks_like_email("plain"));
	}

	#[test]
	fn mobile_format_check() {
		assert!(looks_like_mobile("+1 555-123-0123"));
		assert!(looks_like_mobile("5551230123"));
		assert!(!looks_like_mobile("12345"));
		assert!(!looks_like_mobile("call me"));
	}

	#[test]
	fn code_complete_requires_six_digits() {
		let mut auth = AuthProgress::default();
		assert!(!auth.code_complete());
		auth.code_input = "12345".to_string();
		assert!(!auth.code_complete());
		auth.code_input = "123456".to_string();
		assert!(auth.code_complete());
	}
}
