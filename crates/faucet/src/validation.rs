//! Structural checks on the submitted claim

use serde::Deserialize;
use thiserror::Error;

/// Body of `POST /claimCoins`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClaimForm {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, rename = "g-recaptcha-response")]
    pub captcha_response: Option<String>,
}

impl ClaimForm {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            captcha_response: None,
        }
    }

    /// Submitted address with surrounding whitespace removed
    pub fn trimmed_address(&self) -> Option<&str> {
        self.address.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }
}

/// Why a claim was turned away before anything was looked up.
/// Messages are shown to the visitor as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("The body you sent is empty.")]
    EmptyBody,

    #[error("You have not put in a wallet address.")]
    MissingAddress,

    #[error("The address you put in is not {expected} characters long.")]
    WrongLength { expected: usize },

    #[error("The address you put in does not begin with {expected}.")]
    WrongPrefix { expected: String },

    #[error("The address you put in is the faucet's wallet address.")]
    SelfClaim,
}

#[derive(Debug, Clone)]
pub struct AddressValidator {
    expected_length: usize,
    prefix: String,
}

impl AddressValidator {
    pub fn new(expected_length: usize, prefix: impl Into<String>) -> Self {
        Self {
            expected_length,
            prefix: prefix.into(),
        }
    }

    /// Returns the validated address. Checks run in a fixed order and the
    /// first failure wins.
    pub fn validate<'a>(
        &self,
        form: Option<&'a ClaimForm>,
        faucet_address: &str,
    ) -> Result<&'a str, Rejection> {
        let form = form.ok_or(Rejection::EmptyBody)?;
        let address = form.trimmed_address().ok_or(Rejection::MissingAddress)?;

        if address.chars().count() != self.expected_length {
            return Err(Rejection::WrongLength {
                expected: self.expected_length,
            });
        }
        if !address.starts_with(&self.prefix) {
            return Err(Rejection::WrongPrefix {
                expected: self.prefix.clone(),
            });
        }
        if address == faucet_address {
            return Err(Rejection::SelfClaim);
        }
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> AddressValidator {
        AddressValidator::new(98, "XNU")
    }

    fn address(fill: char) -> String {
        format!("XNU{}", fill.to_string().repeat(95))
    }

    #[test]
    fn test_valid_address() {
        let form = ClaimForm::new(address('a'));
        assert_eq!(validator().validate(Some(&form), &address('f')), Ok(address('a').as_str()));
    }

    #[test]
    fn test_precedence() {
        let v = validator();
        let faucet = address('f');

        assert_eq!(v.validate(None, &faucet), Err(Rejection::EmptyBody));
        assert_eq!(
            v.validate(Some(&ClaimForm::default()), &faucet),
            Err(Rejection::MissingAddress)
        );
        assert_eq!(
            v.validate(Some(&ClaimForm::new("   ")), &faucet),
            Err(Rejection::MissingAddress)
        );
        // Wrong length is reported before the wrong prefix
        assert_eq!(
            v.validate(Some(&ClaimForm::new("ABCshort")), &faucet),
            Err(Rejection::WrongLength { expected: 98 })
        );
        let wrong_prefix = format!("ABC{}", "a".repeat(95));
        assert_eq!(
            v.validate(Some(&ClaimForm::new(wrong_prefix)), &faucet),
            Err(Rejection::WrongPrefix { expected: "XNU".to_string() })
        );
        assert_eq!(
            v.validate(Some(&ClaimForm::new(faucet.clone())), &faucet),
            Err(Rejection::SelfClaim)
        );
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let form = ClaimForm::new(format!("  {}\n", address('a')));
        assert!(validator().validate(Some(&form), &address('f')).is_ok());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Rejection::WrongLength { expected: 98 }.to_string(),
            "The address you put in is not 98 characters long."
        );
        assert_eq!(
            Rejection::WrongPrefix { expected: "XNU".into() }.to_string(),
            "The address you put in does not begin with XNU."
        );
    }
}
