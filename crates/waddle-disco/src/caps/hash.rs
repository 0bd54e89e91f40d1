//! Capability verification strings (XEP-0115 Section 5).
//!
//! A capability hash is only trustworthy if every implementation
//! assembles the exact same byte string from a disco#info result before
//! hashing. The canonical form sorts identities, features, and extended
//! data forms with plain byte-wise string comparison and joins every
//! element with a `<` delimiter, so any permutation of the same input
//! produces the same hash.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha1::{Digest, Sha1};
use sha2::{Sha256, Sha512};

use crate::disco::DiscoInfo;

/// Hash algorithms acceptable in a caps advertisement.
///
/// The wire registry is fixed: advertisement hashes naming anything else
/// are declined up front, never probed, and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// "sha-1", the baseline algorithm
    Sha1,
    /// "sha-256"
    Sha256,
    /// "sha-512"
    Sha512,
}

impl HashAlgorithm {
    /// Look up a wire algorithm name. Returns `None` for unsupported
    /// names so callers can decline without treating it as an error.
    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "sha-1" => Some(Self::Sha1),
            "sha-256" => Some(Self::Sha256),
            "sha-512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// The name this algorithm goes by on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha-1",
            Self::Sha256 => "sha-256",
            Self::Sha512 => "sha-512",
        }
    }

    /// Digest `data` with this algorithm.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Build the canonical verification string for a disco#info result.
///
/// Per XEP-0115 Section 5.1:
/// 1. Identities sorted by category, then type, then lang (absent lang
///    and name read as empty strings): `category/type/lang/name<`
/// 2. Features sorted: `feature<`
/// 3. Extended data forms with a non-empty FORM_TYPE, sorted by
///    FORM_TYPE value: `formtype<`, then each field sorted by name:
///    `var<`, then its values sorted: `value<`
///
/// Forms without a FORM_TYPE (or with an empty one) do not contribute.
pub fn build_verification_string(info: &DiscoInfo) -> String {
    let mut s = String::new();

    let mut identities: Vec<_> = info.identities.iter().collect();
    identities.sort_by(|a, b| {
        (&a.category, &a.type_, a.lang.as_deref().unwrap_or(""))
            .cmp(&(&b.category, &b.type_, b.lang.as_deref().unwrap_or("")))
    });

    for id in identities {
        s.push_str(&id.category);
        s.push('/');
        s.push_str(&id.type_);
        s.push('/');
        if let Some(ref lang) = id.lang {
            s.push_str(lang);
        }
        s.push('/');
        if let Some(ref name) = id.name {
            s.push_str(name);
        }
        s.push('<');
    }

    let mut features: Vec<_> = info.features.iter().collect();
    features.sort();

    for feature in features {
        s.push_str(feature);
        s.push('<');
    }

    let mut forms: Vec<_> = info
        .extensions
        .iter()
        .filter_map(|form| match form.form_type.as_deref() {
            Some(form_type) if !form_type.is_empty() => Some((form_type, form)),
            _ => None,
        })
        .collect();
    forms.sort_by(|a, b| a.0.cmp(b.0));

    for (form_type, form) in forms {
        s.push_str(form_type);
        s.push('<');

        let mut fields: Vec<_> = form.fields.iter().collect();
        fields.sort_by(|a, b| a.var.cmp(&b.var));

        for field in fields {
            s.push_str(&field.var);
            s.push('<');

            let mut values: Vec<_> = field.values.iter().collect();
            values.sort();
            for value in values {
                s.push_str(value);
                s.push('<');
            }
        }
    }

    s
}

/// Compute the capabilities verification hash for a disco#info result.
///
/// Returns the base64 (standard alphabet, padded) encoding of the digest
/// over the UTF-8 bytes of the canonical verification string.
pub fn compute_caps_hash(info: &DiscoInfo, algorithm: HashAlgorithm) -> String {
    let verification_string = build_verification_string(info);
    BASE64.encode(algorithm.digest(verification_string.as_bytes()))
}
