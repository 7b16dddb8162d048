use md5::{Digest, Md5};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::errors::AtlasError;

// Always 1: every logical operation runs its own challenge exchange, so
// the counter never advances.
const NONCE_COUNT: &str = "00000001";

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Challenge {
    pub realm: String,
    pub nonce: String,
    pub qop: String,
}

impl Challenge {
    // The header carries comma-separated `key="value"` pairs after the
    // `Digest` prefix; keys other than these three are ignored.
    pub fn parse(header: &str) -> Result<Self, AtlasError> {
        let mut realm = None;
        let mut nonce = None;
        let mut qop = None;

        for part in header.trim_start_matches("Digest").split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"');
            match key.trim() {
                "realm" => realm = Some(value.to_owned()),
                "nonce" => nonce = Some(value.to_owned()),
                "qop" => qop = Some(value.to_owned()),
                _ => {}
            }
        }

        match (realm, nonce, qop) {
            (Some(realm), Some(nonce), Some(qop)) => Ok(Challenge { realm, nonce, qop }),
            _ => Err(AtlasError::BadChallenge(
                "challenge is missing realm, nonce or qop".into(),
            )),
        }
    }
}

// `uri` must be the request path with query, never the absolute URL.
pub(crate) fn authorization(
    challenge: &Challenge,
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
) -> String {
    header_with_cnonce(challenge, username, password, method, uri, &cnonce())
}

fn header_with_cnonce(
    challenge: &Challenge,
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
    cnonce: &str,
) -> String {
    let ha1 = md5_hex(&format!("{username}:{}:{password}", challenge.realm));
    let ha2 = md5_hex(&format!("{method}:{uri}"));
    let response = md5_hex(&format!(
        "{ha1}:{}:{NONCE_COUNT}:{cnonce}:{}:{ha2}",
        challenge.nonce, challenge.qop
    ));

    format!(
        r#"Digest username="{username}", realm="{}", nonce="{}", uri="{uri}", cnonce="{cnonce}", nc="{NONCE_COUNT}", qop="{}", response="{response}""#,
        challenge.realm, challenge.nonce, challenge.qop
    )
}

// 16 lowercase hex characters from a cryptographic random source.
fn cnonce() -> String {
    let mut bytes = [0u8; 8];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_challenge_header() {
        let header = r#"Digest realm="MMS Public API", domain="", nonce="wZ8rSJoyCjTAnEDi", algorithm=MD5, qop="auth", stale=false"#;
        let challenge = Challenge::parse(header).unwrap();

        assert_eq!(
            challenge,
            Challenge {
                realm: "MMS Public API".into(),
                nonce: "wZ8rSJoyCjTAnEDi".into(),
                qop: "auth".into(),
            }
        );
    }

    #[test]
    fn rejects_incomplete_challenge() {
        let err = Challenge::parse(r#"Digest realm="only a realm""#).unwrap_err();
        assert!(matches!(err, AtlasError::BadChallenge(_)));
    }

    // Known-answer test from RFC 2617 section 3.5.
    #[test]
    fn computes_rfc2617_example_response() {
        let challenge = Challenge {
            realm: "testrealm@host.com".into(),
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093025f85".into(),
            qop: "auth".into(),
        };

        let header = header_with_cnonce(
            &challenge,
            "Mufasa",
            "Circle Of Life",
            "GET",
            "/dir/index.html",
            "0a4f113b",
        );

        assert!(header.starts_with(r#"Digest username="Mufasa""#));
        assert!(header.contains(r#"uri="/dir/index.html""#));
        assert!(header.contains(r#"nc="00000001""#));
        assert!(header.contains(r#"response="6629fae49393a05397450978507c4ef1""#));
    }

    #[test]
    fn cnonce_is_16_lowercase_hex_chars() {
        let value = cnonce();
        assert_eq!(value.len(), 16);
        assert!(value
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
