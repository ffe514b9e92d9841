use std::fmt;

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CoreError, Result};
use crate::frame::{Column, DataFrame};

pub const TYPE_COLUMN: &str = "type";
pub const SECTOR_COLUMN: &str = "sector";
pub const NET_USABLE_AREA_COLUMN: &str = "net_usable_area";
pub const NET_AREA_COLUMN: &str = "net_area";
pub const N_ROOMS_COLUMN: &str = "n_rooms";
pub const N_BATHROOM_COLUMN: &str = "n_bathroom";
pub const LATITUDE_COLUMN: &str = "latitude";
pub const LONGITUDE_COLUMN: &str = "longitude";
pub const PRICE_COLUMN: &str = "price";
pub const ID_COLUMN: &str = "id";

/// Columns that carry categorical values and are target-encoded before training.
pub const CATEGORICAL_COLUMNS: [&str; 2] = [TYPE_COLUMN, SECTOR_COLUMN];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    /// House.
    Casa,
    /// Apartment.
    Departamento,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Casa => "casa",
            PropertyType::Departamento => "departamento",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sector {
    #[serde(rename = "la reina")]
    LaReina,
    #[serde(rename = "las condes")]
    LasCondes,
    #[serde(rename = "vitacura")]
    Vitacura,
    #[serde(rename = "lo barnechea")]
    LoBarnechea,
    #[serde(rename = "nunoa")]
    Nunoa,
    #[serde(rename = "providencia")]
    Providencia,
}

impl Sector {
    pub const ALL: [Sector; 6] = [
        Sector::LaReina,
        Sector::LasCondes,
        Sector::Vitacura,
        Sector::LoBarnechea,
        Sector::Nunoa,
        Sector::Providencia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::LaReina => "la reina",
            Sector::LasCondes => "las condes",
            Sector::Vitacura => "vitacura",
            Sector::LoBarnechea => "lo barnechea",
            Sector::Nunoa => "nunoa",
            Sector::Providencia => "providencia",
        }
    }
}

/// One property observation as accepted by the prediction endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyRecord {
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub sector: Sector,
    pub net_usable_area: f64,
    pub net_area: f64,
    #[serde(deserialize_with = "deserialize_count")]
    pub n_rooms: u32,
    #[serde(deserialize_with = "deserialize_count")]
    pub n_bathroom: u32,
    pub latitude: f64,
    pub longitude: f64,
}

impl PropertyRecord {
    /// Checks the constraints serde cannot express: finite, non-negative areas
    /// and finite coordinates.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            (NET_USABLE_AREA_COLUMN, self.net_usable_area),
            (NET_AREA_COLUMN, self.net_area),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::InvalidData(format!(
                    "{} must be a finite number >= 0, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            (LATITUDE_COLUMN, self.latitude),
            (LONGITUDE_COLUMN, self.longitude),
        ] {
            if !value.is_finite() {
                return Err(CoreError::InvalidData(format!(
                    "{} must be a finite number",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Single-row frame with the same column names as the training data.
    pub fn to_frame(&self) -> Result<DataFrame> {
        DataFrame::from_columns([
            (
                TYPE_COLUMN,
                Column::Categorical(vec![self.property_type.as_str().to_string()]),
            ),
            (
                SECTOR_COLUMN,
                Column::Categorical(vec![self.sector.as_str().to_string()]),
            ),
            (NET_USABLE_AREA_COLUMN, Column::Numeric(vec![self.net_usable_area])),
            (NET_AREA_COLUMN, Column::Numeric(vec![self.net_area])),
            (N_ROOMS_COLUMN, Column::Numeric(vec![self.n_rooms as f64])),
            (N_BATHROOM_COLUMN, Column::Numeric(vec![self.n_bathroom as f64])),
            (LATITUDE_COLUMN, Column::Numeric(vec![self.latitude])),
            (LONGITUDE_COLUMN, Column::Numeric(vec![self.longitude])),
        ])
    }
}

/// Room counts accept whole-valued floats (`3.0`) as well as integers.
fn deserialize_count<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    struct CountVisitor;

    impl Visitor<'_> for CountVisitor {
        type Value = u32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative whole number")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<u32, E> {
            u32::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<u32, E> {
            u32::try_from(v).map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<u32, E> {
            if v.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&v) {
                Ok(v as u32)
            } else {
                Err(E::invalid_value(Unexpected::Float(v), &self))
            }
        }
    }

    deserializer.deserialize_any(CountVisitor)
}
