//! Recovers a file's type from its first bytes after decryption.
//!
//! Purely cosmetic: the result picks a MIME type and fixes up the file
//! extension. It never influences whether decryption is trusted.

use std::fmt;

/// Number of leading bytes the sniffer looks at.
pub const SNIFF_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SniffedType {
    Jpeg,
    Png,
    Gif,
    Pdf,
    Zip,
    Unknown,
}

/// Disjoint magic prefixes. Longest match wins.
static MAGIC_TABLE: &[(&[u8], SniffedType)] = &[
    (&[0xFF, 0xD8, 0xFF], SniffedType::Jpeg),
    (&[0x89, 0x50, 0x4E, 0x47], SniffedType::Png),
    (&[0x47, 0x49, 0x46, 0x38], SniffedType::Gif),
    (&[0x25, 0x50, 0x44, 0x46], SniffedType::Pdf),
    (&[0x50, 0x4B, 0x03, 0x04], SniffedType::Zip),
];

impl SniffedType {
    pub fn mime(&self) -> &'static str {
        match self {
            SniffedType::Jpeg => "image/jpeg",
            SniffedType::Png => "image/png",
            SniffedType::Gif => "image/gif",
            SniffedType::Pdf => "application/pdf",
            SniffedType::Zip => "application/zip",
            SniffedType::Unknown => "application/octet-stream",
        }
    }

    /// Accepted extensions, canonical one first. Empty for `Unknown`.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            SniffedType::Jpeg => &["jpg", "jpeg"],
            SniffedType::Png => &["png"],
            SniffedType::Gif => &["gif"],
            SniffedType::Pdf => &["pdf"],
            SniffedType::Zip => &["zip"],
            SniffedType::Unknown => &[],
        }
    }

    pub fn is_known(&self) -> bool {
        *self != SniffedType::Unknown
    }
}

impl fmt::Display for SniffedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SniffedType::Jpeg => "JPEG",
            SniffedType::Png => "PNG",
            SniffedType::Gif => "GIF",
            SniffedType::Pdf => "PDF",
            SniffedType::Zip => "ZIP",
            SniffedType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Classify plaintext by its leading magic bytes.
pub fn classify(bytes: &[u8]) -> SniffedType {
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];

    MAGIC_TABLE
        .iter()
        .filter(|(prefix, _)| head.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, kind)| *kind)
        .unwrap_or(SniffedType::Unknown)
}

/// Give `name` an extension that fits `kind`.
///
/// Names that already carry an accepted extension (any case) and every name
/// paired with `Unknown` come back untouched. A leading dot does not start an
/// extension, so `.profile` becomes `.profile.pdf`.
pub fn repair_name(name: &str, kind: SniffedType) -> String {
    let Some(canonical) = kind.extensions().first() else {
        return name.to_string();
    };

    let (stem, ext) = split_extension(name);
    if let Some(ext) = ext {
        if kind
            .extensions()
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(ext))
        {
            return name.to_string();
        }
    }

    format!("{stem}.{canonical}")
}

/// Splits `dir/file.ext` into (`dir/file`, Some(`ext`)).
fn split_extension(name: &str) -> (&str, Option<&str>) {
    let base_start = name.rfind(['/', '\\']).map_or(0, |i| i + 1);
    let base = &name[base_start..];

    match base.rfind('.') {
        Some(dot) if dot > 0 => {
            let split = base_start + dot;
            (&name[..split], Some(&name[split + 1..]))
        }
        _ => (name, None),
    }
}
