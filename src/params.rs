//! Clinical parameter vector and per-field domains.
//!
//! A [`ParameterVector`] is always fully populated: it is constructed with
//! every field present and each mutation replaces one value after validating
//! it against the field's declared [`FieldDomain`]. Out-of-domain values are
//! rejected, never clamped.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A named clinical input field.
///
/// Declaration order is the canonical field order of a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    /// Age in years.
    #[serde(rename = "age")]
    Age,
    /// Sex (0 female, 1 male).
    #[serde(rename = "sex")]
    Sex,
    /// Chest pain type.
    #[serde(rename = "cp")]
    ChestPainType,
    /// Resting blood pressure (mm Hg).
    #[serde(rename = "trestbps")]
    RestingBloodPressure,
    /// Serum cholesterol (mg/dl).
    #[serde(rename = "chol")]
    Cholesterol,
    /// Fasting blood sugar above 120 mg/dl.
    #[serde(rename = "fbs")]
    FastingBloodSugar,
    /// Resting electrocardiographic result.
    #[serde(rename = "restecg")]
    RestingEcg,
    /// Maximum heart rate achieved.
    #[serde(rename = "thalach")]
    MaxHeartRate,
    /// Exercise induced angina.
    #[serde(rename = "exang")]
    ExerciseAngina,
    /// ST depression induced by exercise relative to rest.
    #[serde(rename = "oldpeak")]
    StDepression,
    /// Slope of the peak exercise ST segment.
    #[serde(rename = "slope")]
    StSlope,
    /// Number of major vessels colored by fluoroscopy.
    #[serde(rename = "ca")]
    VesselCount,
    /// Thalassemia type.
    #[serde(rename = "thal")]
    Thalassemia,
}

impl Field {
    /// Number of fields in a vector.
    pub const COUNT: usize = 13;

    /// All fields in canonical order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Age,
        Self::Sex,
        Self::ChestPainType,
        Self::RestingBloodPressure,
        Self::Cholesterol,
        Self::FastingBloodSugar,
        Self::RestingEcg,
        Self::MaxHeartRate,
        Self::ExerciseAngina,
        Self::StDepression,
        Self::StSlope,
        Self::VesselCount,
        Self::Thalassemia,
    ];

    /// Wire name of the field, as the oracle and history store know it.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Sex => "sex",
            Self::ChestPainType => "cp",
            Self::RestingBloodPressure => "trestbps",
            Self::Cholesterol => "chol",
            Self::FastingBloodSugar => "fbs",
            Self::RestingEcg => "restecg",
            Self::MaxHeartRate => "thalach",
            Self::ExerciseAngina => "exang",
            Self::StDepression => "oldpeak",
            Self::StSlope => "slope",
            Self::VesselCount => "ca",
            Self::Thalassemia => "thal",
        }
    }

    /// Declared numeric domain of the field.
    #[must_use]
    pub const fn domain(self) -> FieldDomain {
        match self {
            Self::Age => FieldDomain::Continuous { min: 20.0, max: 100.0 },
            Self::RestingBloodPressure => FieldDomain::Continuous { min: 90.0, max: 200.0 },
            Self::Cholesterol => FieldDomain::Continuous { min: 100.0, max: 500.0 },
            Self::MaxHeartRate => FieldDomain::Continuous { min: 70.0, max: 220.0 },
            Self::StDepression => FieldDomain::Continuous { min: 0.0, max: 6.0 },
            Self::Sex | Self::FastingBloodSugar | Self::ExerciseAngina => {
                FieldDomain::Enumerated(&[0, 1])
            }
            Self::RestingEcg | Self::StSlope | Self::Thalassemia => {
                FieldDomain::Enumerated(&[0, 1, 2])
            }
            Self::ChestPainType | Self::VesselCount => FieldDomain::Enumerated(&[0, 1, 2, 3]),
        }
    }

    /// Human-readable description, suitable for tooltips.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Age => "Age in years",
            Self::Sex => "Gender (1 = male; 0 = female)",
            Self::ChestPainType => {
                "Chest pain type (0: typical angina, 1: atypical angina, 2: non-anginal pain, 3: asymptomatic)"
            }
            Self::RestingBloodPressure => "Resting blood pressure in mm Hg",
            Self::Cholesterol => "Serum cholesterol in mg/dl",
            Self::FastingBloodSugar => "Fasting blood sugar > 120 mg/dl (1 = true; 0 = false)",
            Self::RestingEcg => {
                "Resting electrocardiographic results (0: normal, 1: ST-T wave abnormality, 2: left ventricular hypertrophy)"
            }
            Self::MaxHeartRate => "Maximum heart rate achieved",
            Self::ExerciseAngina => "Exercise induced angina (1 = yes; 0 = no)",
            Self::StDepression => "ST depression induced by exercise relative to rest",
            Self::StSlope => {
                "Slope of the peak exercise ST segment (0: upsloping, 1: flat, 2: downsloping)"
            }
            Self::VesselCount => "Number of major vessels (0-3) colored by fluoroscopy",
            Self::Thalassemia => "Thalassemia (0: normal, 1: fixed defect, 2: reversible defect)",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ValidationError::UnknownField {
                name: s.to_string(),
            })
    }
}

/// Numeric domain of a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDomain {
    /// Closed continuous range `[min, max]`.
    Continuous {
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// Enumerated integer codes.
    Enumerated(&'static [u8]),
}

impl FieldDomain {
    /// Returns true if `value` lies inside the domain.
    ///
    /// Non-finite values are never valid. Enumerated domains require an
    /// integral value that is one of the declared codes.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            Self::Continuous { min, max } => (*min..=*max).contains(&value),
            Self::Enumerated(codes) => {
                value.fract() == 0.0 && codes.iter().any(|&code| f64::from(code) == value)
            }
        }
    }

    /// Returns true for categorical, integer-coded domains.
    #[must_use]
    pub const fn is_enumerated(&self) -> bool {
        matches!(self, Self::Enumerated(_))
    }
}

impl fmt::Display for FieldDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuous { min, max } => write!(f, "[{min}, {max}]"),
            Self::Enumerated(codes) => {
                f.write_str("{")?;
                for (i, code) in codes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{code}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn check(field: Field, value: f64) -> Result<(), ValidationError> {
    let domain = field.domain();
    if domain.contains(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidDomain {
            field,
            value,
            domain,
        })
    }
}

/// Complete set of clinical inputs describing one subject at a point in time.
///
/// Serializes as a JSON object keyed by wire field name. Deserialization
/// requires every field and validates each value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<Field, f64>", into = "BTreeMap<Field, f64>")]
pub struct ParameterVector {
    values: [f64; Field::COUNT],
}

impl ParameterVector {
    /// Builds a vector from `(field, value)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` if any field is absent and `InvalidDomain` if
    /// any value falls outside its field's domain. Later duplicates win.
    pub fn new(pairs: impl IntoIterator<Item = (Field, f64)>) -> Result<Self, ValidationError> {
        let mut slots: [Option<f64>; Field::COUNT] = [None; Field::COUNT];
        for (field, value) in pairs {
            check(field, value)?;
            slots[field.index()] = Some(value);
        }

        let mut values = [0.0; Field::COUNT];
        for field in Field::ALL {
            values[field.index()] = slots[field.index()].ok_or_else(|| ValidationError::MissingField {
                field: field.name().to_string(),
            })?;
        }
        Ok(Self { values })
    }

    /// Value of `field`.
    #[must_use]
    pub const fn get(&self, field: Field) -> f64 {
        self.values[field.index()]
    }

    /// Replaces the value of `field`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDomain` without touching the vector if `value` is
    /// outside the field's domain.
    pub fn set(&mut self, field: Field, value: f64) -> Result<(), ValidationError> {
        check(field, value)?;
        self.values[field.index()] = value;
        Ok(())
    }

    /// Returns a copy with `field` replaced.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDomain` if `value` is outside the field's domain.
    pub fn with(&self, field: Field, value: f64) -> Result<Self, ValidationError> {
        let mut next = self.clone();
        next.set(field, value)?;
        Ok(next)
    }

    /// Re-checks every field against its domain.
    ///
    /// # Errors
    ///
    /// Returns the first `InvalidDomain` found in canonical field order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.iter().try_for_each(|(field, value)| check(field, value))
    }

    /// Iterates `(field, value)` in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, f64)> + '_ {
        Field::ALL.iter().map(move |&field| (field, self.get(field)))
    }

    /// Fields whose values differ from `other`.
    #[must_use]
    pub fn diff(&self, other: &Self) -> Vec<Field> {
        Field::ALL
            .iter()
            .copied()
            .filter(|&field| self.get(field) != other.get(field))
            .collect()
    }
}

impl Default for ParameterVector {
    /// Population-typical starting point used as the simulator baseline.
    fn default() -> Self {
        Self {
            values: [
                50.0,  // age
                1.0,   // sex
                0.0,   // cp
                120.0, // trestbps
                200.0, // chol
                0.0,   // fbs
                0.0,   // restecg
                150.0, // thalach
                0.0,   // exang
                0.0,   // oldpeak
                1.0,   // slope
                0.0,   // ca
                2.0,   // thal
            ],
        }
    }
}

impl TryFrom<BTreeMap<Field, f64>> for ParameterVector {
    type Error = ValidationError;

    fn try_from(map: BTreeMap<Field, f64>) -> Result<Self, Self::Error> {
        Self::new(map)
    }
}

impl From<ParameterVector> for BTreeMap<Field, f64> {
    fn from(vector: ParameterVector) -> Self {
        vector.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vector_is_valid() {
        ParameterVector::default().validate().unwrap();
        assert_eq!(ParameterVector::default().get(Field::Age), 50.0);
        assert_eq!(ParameterVector::default().get(Field::Thalassemia), 2.0);
    }

    #[test]
    fn field_order_matches_index() {
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
    }

    #[test]
    fn field_parses_wire_names() {
        assert_eq!("trestbps".parse::<Field>().unwrap(), Field::RestingBloodPressure);
        assert_eq!(" CP ".parse::<Field>().unwrap(), Field::ChestPainType);
        assert!(matches!(
            "bmi".parse::<Field>(),
            Err(ValidationError::UnknownField { .. })
        ));
    }

    #[test]
    fn enumerated_domain_rejects_out_of_set_and_fractional() {
        let sex = Field::Sex.domain();
        assert!(sex.contains(0.0));
        assert!(sex.contains(1.0));
        assert!(!sex.contains(2.0));
        assert!(!sex.contains(0.5));
        assert!(sex.is_enumerated());
    }

    #[test]
    fn continuous_domain_is_inclusive_and_rejects_nan() {
        let oldpeak = Field::StDepression.domain();
        assert!(oldpeak.contains(0.0));
        assert!(oldpeak.contains(6.0));
        assert!(oldpeak.contains(2.3));
        assert!(!oldpeak.contains(6.1));
        assert!(!oldpeak.contains(f64::NAN));
        assert!(!oldpeak.contains(f64::INFINITY));
    }

    #[test]
    fn set_rejects_without_mutation() {
        let mut v = ParameterVector::default();
        let before = v.clone();
        let err = v.set(Field::Sex, 2.0).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDomain { field: Field::Sex, .. }));
        assert_eq!(v, before);

        v.set(Field::Age, 65.0).unwrap();
        assert_eq!(v.get(Field::Age), 65.0);
        assert_eq!(v.diff(&before), vec![Field::Age]);
    }

    #[test]
    fn new_requires_every_field() {
        let pairs: Vec<_> = ParameterVector::default()
            .iter()
            .filter(|(f, _)| *f != Field::Cholesterol)
            .collect();
        let err = ParameterVector::new(pairs).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: "chol".to_string()
            }
        );
    }

    #[test]
    fn json_uses_wire_names_and_validates() {
        let json = serde_json::to_value(ParameterVector::default()).unwrap();
        assert_eq!(json["trestbps"], serde_json::json!(120.0));
        assert_eq!(json.as_object().unwrap().len(), Field::COUNT);

        let back: ParameterVector = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, ParameterVector::default());

        let mut missing = json.clone();
        missing.as_object_mut().unwrap().remove("thal");
        assert!(serde_json::from_value::<ParameterVector>(missing).is_err());

        let mut out_of_domain = json;
        out_of_domain["ca"] = serde_json::json!(7);
        assert!(serde_json::from_value::<ParameterVector>(out_of_domain).is_err());
    }

    #[test]
    fn domain_display() {
        assert_eq!(Field::ChestPainType.domain().to_string(), "{0, 1, 2, 3}");
        assert_eq!(Field::Age.domain().to_string(), "[20, 100]");
    }
}
