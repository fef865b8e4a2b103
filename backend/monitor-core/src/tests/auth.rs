// Unit tests for the hash derivation and cookie lookup helpers.
// The handshake's HTTP side is covered in integration_tests/auth.rs.

use crate::auth::{Credential, derive_base_hash, derive_login_hash, find_set_cookie};
use crate::error::request::RequestError;

use common::RedactedPassword;

use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};

// Fixed vector: password "correct horse battery staple",
// salt  = b"0123456789abcdef0123456789abcdef",
// nonce = b"fedcba9876543210fedcba9876543210".
const SALT_B64: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
const NONCE_B64: &str = "ZmVkY2JhOTg3NjU0MzIxMGZlZGNiYTk4NzY1NDMyMTA=";
const H1_B64: &str = "fvGECwDcUnhCqLUc/vHBGUrBv3806gRW4rwsqRNmiX0=";
const H2_B64: &str = "gDbUzbv0DDTgewxmECvlyrpE9fbCH7LuEM9GUOVpkj4=";

fn password_credential() -> Credential {
    Credential::Password(RedactedPassword::new(String::from(
        "correct horse battery staple",
    )))
}

/// **VALUE**: Pins the login hash derivation to a known vector, byte for byte.
///
/// **WHY THIS MATTERS**: The server stores `SHA256(password || salt)`; any
/// drift in the hashing order or encoding locks every user out with no error
/// message beyond a failed login.
///
/// **BUG THIS CATCHES**: Swapping the hash input order (salt before password,
/// or H1 before nonce), or encoding with a URL-safe base64 alphabet.
#[test]
fn given_fixed_salt_and_nonce_when_hashes_derived_then_match_known_vector() {
    // GIVEN: The fixed password/salt/nonce vector
    let credential = password_credential();

    // WHEN: Deriving both hashes
    let base = derive_base_hash(&credential, SALT_B64).unwrap();
    let login = derive_login_hash(&base, NONCE_B64).unwrap();

    // THEN: Both match the precomputed vector
    assert_eq!(base, H1_B64, "H1 = SHA256(password || salt)");
    assert_eq!(login, H2_B64, "H2 = SHA256(nonce || H1)");
}

/// **VALUE**: Verifies the pre-salted credential path skips the salt step but
/// still yields the same transmitted hash.
///
/// **WHY THIS MATTERS**: Deployments may configure the stored hash instead of
/// the raw password; both paths must converge on the same wire value.
#[test]
fn given_presalted_credential_when_login_hash_derived_then_matches_password_path() {
    // GIVEN: The stored hash configured directly
    let credential = Credential::SaltedHash(RedactedPassword::new(String::from(H1_B64)));

    // WHEN: Deriving the base hash (salt must be ignored)
    let base = derive_base_hash(&credential, "ignored-not-even-base64").unwrap();
    let login = derive_login_hash(&base, NONCE_B64).unwrap();

    // THEN: Same transmitted hash as the raw-password path
    assert_eq!(login, H2_B64);
}

#[test]
fn given_malformed_salt_when_base_hash_derived_then_auth_error() {
    let result = derive_base_hash(&password_credential(), "!!not-base64!!");

    assert!(matches!(result, Err(RequestError::Auth { .. })));
}

#[test]
fn given_malformed_nonce_when_login_hash_derived_then_auth_error() {
    let result = derive_login_hash(H1_B64, "!!not-base64!!");

    assert!(matches!(result, Err(RequestError::Auth { .. })));
}

/// **VALUE**: Verifies the Set-Cookie lookup finds the session cookie among
/// attributes and other cookies, and strips attributes from the value.
///
/// **BUG THIS CATCHES**: Returning "tok; Path=/" as the token, or matching
/// only the first Set-Cookie header.
#[test]
fn given_multiple_set_cookies_when_auth_cookie_searched_then_value_found() {
    // GIVEN: A response with an unrelated cookie before the session cookie
    let mut headers = HeaderMap::new();
    headers.append(SET_COOKIE, HeaderValue::from_static("theme=dark; Path=/"));
    headers.append(
        SET_COOKIE,
        HeaderValue::from_static("session-auth=tok-123; Path=/; HttpOnly"),
    );

    // WHEN: Searching for the session cookie
    let value = find_set_cookie(&headers, "session-auth");

    // THEN: The bare value is returned
    assert_eq!(value.as_deref(), Some("tok-123"));
}

#[test]
fn given_no_matching_cookie_when_searched_then_none() {
    let mut headers = HeaderMap::new();
    headers.append(SET_COOKIE, HeaderValue::from_static("theme=dark; Path=/"));

    assert!(find_set_cookie(&headers, "session-auth").is_none());
}
