use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a series is projected out of its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// `Date` plus the raw value column, one row per observation.
    Observations,
    /// A single arithmetic mean of the value column over the range.
    Mean,
}

/// The catalogue of economic series served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Series {
    RealGdp,
    RealGdpPerCapita,
    FederalFundsEffectiveRate,
    LaborForceParticipationRate,
    UnemploymentRate,
    MeanUnemploymentRate,
    RealMedianPersonalIncome,
}

impl Series {
    pub const ALL: [Series; 7] = [
        Series::RealGdp,
        Series::RealGdpPerCapita,
        Series::FederalFundsEffectiveRate,
        Series::LaborForceParticipationRate,
        Series::UnemploymentRate,
        Series::MeanUnemploymentRate,
        Series::RealMedianPersonalIncome,
    ];

    /// The URL slug, also used on the command line.
    pub fn slug(&self) -> &'static str {
        match self {
            Series::RealGdp => "real-gdp",
            Series::RealGdpPerCapita => "real-gdp-per-capita",
            Series::FederalFundsEffectiveRate => "federal-funds-effective-rate",
            Series::LaborForceParticipationRate => "labor-force-participation-rate",
            Series::UnemploymentRate => "unemployment-rate",
            Series::MeanUnemploymentRate => "mean-unemployment-rate",
            Series::RealMedianPersonalIncome => "real-median-personal-income",
        }
    }

    /// The table in the `main` schema that backs this series.
    pub fn table(&self) -> &'static str {
        match self {
            Series::RealGdp => "real_gdp",
            Series::RealGdpPerCapita => "real_gdp_per_capita",
            Series::FederalFundsEffectiveRate => "federal_funds_effective_rate",
            Series::LaborForceParticipationRate => "labor_force_participation_rate",
            Series::UnemploymentRate | Series::MeanUnemploymentRate => "unemployment_rate",
            Series::RealMedianPersonalIncome => "real_median_personal_income",
        }
    }

    /// The FRED series code stored in the value column.
    pub fn value_column(&self) -> &'static str {
        match self {
            Series::RealGdp => "GDPC1",
            Series::RealGdpPerCapita => "A939RX0Q048SBEA",
            Series::FederalFundsEffectiveRate => "DFF",
            Series::LaborForceParticipationRate => "CIVPART",
            Series::UnemploymentRate | Series::MeanUnemploymentRate => "UNRATE",
            Series::RealMedianPersonalIncome => "MEPAINUSA672N",
        }
    }

    pub fn kind(&self) -> SeriesKind {
        match self {
            Series::MeanUnemploymentRate => SeriesKind::Mean,
            _ => SeriesKind::Observations,
        }
    }

    /// The column names a result row for this series carries, in order.
    pub fn output_columns(&self) -> &'static [&'static str] {
        match self {
            Series::RealGdp => &["Date", "GDPC1"],
            Series::RealGdpPerCapita => &["Date", "A939RX0Q048SBEA"],
            Series::FederalFundsEffectiveRate => &["Date", "DFF"],
            Series::LaborForceParticipationRate => &["Date", "CIVPART"],
            Series::UnemploymentRate => &["Date", "UNRATE"],
            Series::MeanUnemploymentRate => &["MeanUnemploymentRate"],
            Series::RealMedianPersonalIncome => &["Date", "MEPAINUSA672N"],
        }
    }

    /// Human-readable name used in log lines and error bodies.
    pub fn label(&self) -> &'static str {
        match self {
            Series::RealGdp => "real GDP",
            Series::RealGdpPerCapita => "real GDP per capita",
            Series::FederalFundsEffectiveRate => "federal funds effective rate",
            Series::LaborForceParticipationRate => "labor force participation rate",
            Series::UnemploymentRate => "unemployment rate",
            Series::MeanUnemploymentRate => "mean unemployment rate",
            Series::RealMedianPersonalIncome => "real median personal income",
        }
    }

    /// The HTTP route serving this series.
    pub fn path(&self) -> String {
        format!("/api/{}", self.slug())
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Series {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Series::ALL
            .into_iter()
            .find(|series| series.slug() == s)
            .ok_or_else(|| CoreError::InvalidInput("series".to_string(), s.to_string()))
    }
}

/// The `startDate`/`endDate` pair taken from a request.
///
/// The dates are kept as untrusted text: they are only ever bound as query
/// parameters and cast by the database. Missing parameters become empty
/// strings, which the cast rejects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(rename = "startDate", default)]
    pub start_date: String,
    #[serde(rename = "endDate", default)]
    pub end_date: String,
}

impl DateRange {
    pub fn new(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }
}
