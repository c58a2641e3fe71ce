use std::fmt;

use serde::Deserialize;

/// Attribute key the looked-up address is stored under.
pub const ADDRESS_KEY: &str = "Adresse";
pub const DEFAULT_SRID: u32 = 25832;

#[derive(Debug)]
pub enum AddressError {
    Parse(serde_json::Error),
    NotFound,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::Parse(err) => write!(f, "address lookup parse error: {err}"),
            AddressError::NotFound => write!(f, "no address at this position"),
        }
    }
}

impl std::error::Error for AddressError {}

/// Access-point accuracy grade.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Accuracy {
    A,
    B,
    C,
    Unknown,
}

impl Accuracy {
    pub fn from_grade(grade: &str) -> Self {
        match grade {
            "A" => Accuracy::A,
            "B" => Accuracy::B,
            "C" => Accuracy::C,
            _ => Accuracy::Unknown,
        }
    }

    /// Feature recolor for this grade; `None` leaves the color alone.
    pub fn color(self) -> Option<u32> {
        match self {
            Accuracy::A => Some(0x00ff00),
            Accuracy::B => Some(0xffff00),
            Accuracy::C => Some(0xff0000),
            Accuracy::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub street: String,
    pub house_number: String,
    pub postal_code: String,
    pub accuracy: Accuracy,
}

impl Address {
    /// `"<street> <number>, <postal code>"`.
    pub fn label(&self) -> String {
        format!("{} {}, {}", self.street, self.house_number, self.postal_code)
    }
}

/// Reverse lookup URL for map point `(x, y)` in `srid`.
pub fn reverse_url(base: &str, x: f64, y: f64, srid: u32) -> String {
    format!(
        "{}/adgangsadresser/reverse?x={x}&y={y}&srid={srid}",
        base.trim_end_matches('/')
    )
}

#[derive(Deserialize)]
struct RawAddress {
    vejstykke: RawStreet,
    husnr: String,
    postnummer: RawPostal,
    #[serde(default)]
    adgangspunkt: Option<RawAccessPoint>,
}

#[derive(Deserialize)]
struct RawStreet {
    adresseringsnavn: String,
}

#[derive(Deserialize)]
struct RawPostal {
    nr: String,
}

#[derive(Deserialize)]
struct RawAccessPoint {
    #[serde(rename = "nøjagtighed", default)]
    accuracy: Option<String>,
}

/// Parses a reverse-lookup response. An empty array or object means no hit.
pub fn parse_address(payload: &str) -> Result<Address, AddressError> {
    let value: serde_json::Value = serde_json::from_str(payload).map_err(AddressError::Parse)?;
    let empty = match &value {
        serde_json::Value::Array(a) => a.is_empty(),
        serde_json::Value::Object(o) => o.is_empty(),
        serde_json::Value::Null => true,
        _ => false,
    };
    if empty {
        return Err(AddressError::NotFound);
    }

    let raw: RawAddress = serde_json::from_value(value).map_err(AddressError::Parse)?;
    let accuracy = raw
        .adgangspunkt
        .and_then(|a| a.accuracy)
        .map_or(Accuracy::Unknown, |g| Accuracy::from_grade(&g));
    Ok(Address {
        street: raw.vejstykke.adresseringsnavn,
        house_number: raw.husnr,
        postal_code: raw.postnummer.nr,
        accuracy,
    })
}
