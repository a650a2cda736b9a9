//! URIs identifying security policies and the individual algorithms that
//! make them up (§6.4).

/// No security.
pub const SECURITY_POLICY_NONE_URI: &str = "http://opcfoundation.org/UA/SecurityPolicy#None";

/// The only symmetric/asymmetric bundle this crate implements (§6.4).
pub const SECURITY_POLICY_BASIC256SHA256_URI: &str =
    "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256";

/// HMAC-SHA256 symmetric signature algorithm URI.
pub const SYMMETRIC_SIGNATURE_HMAC_SHA256: &str =
    "http://www.w3.org/2000/09/xmldsig#hmac-sha256";

/// AES-256-CBC symmetric encryption algorithm URI.
pub const SYMMETRIC_ENCRYPTION_AES256_CBC: &str =
    "http://www.w3.org/2001/04/xmlenc#aes256-cbc";

/// RSA-OAEP-SHA1 asymmetric encryption algorithm URI.
pub const ASYMMETRIC_ENCRYPTION_RSA_OAEP: &str =
    "http://www.w3.org/2001/04/xmlenc#rsa-oaep";

/// RSASSA-PKCS1-v1_5 with SHA-256 asymmetric signature algorithm URI.
pub const ASYMMETRIC_SIGNATURE_RSA_SHA256: &str =
    "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

/// The pseudo-random function used to derive key material (P_SHA-256,
/// RFC 5246 §5).
pub const KEY_DERIVATION_P_SHA256: &str = "http://docs.oasis-open.org/ws-sx/ws-secureconversation/200512/dk/p_sha256";
