//! Parameter space definitions and the seeded random sampler.

use hs_types::{ConfigError, HyperparameterSet, ParameterEntry};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Decimal digits every candidate value is rounded to.
pub const RANGE_DECIMALS: i32 = 4;

/// Ties go to the even neighbour, so `0.00025` becomes `0.0002`.
pub fn round_to_decimals(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// Declared bounds of a discretized range: `points` values from `low` to
/// `high`, both endpoints included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeSpec {
    pub low: f64,
    pub high: f64,
    pub points: usize,
}

impl RangeSpec {
    pub fn new(low: f64, high: f64, points: usize) -> Self {
        Self { low, high, points }
    }

    pub fn validate(&self, field: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidRange {
            field: field.to_string(),
            message,
        };
        if self.points < 1 {
            return Err(invalid("point count must be at least 1".to_string()));
        }
        if !self.low.is_finite() || !self.high.is_finite() {
            return Err(invalid(format!(
                "bounds must be finite, got [{}, {}]",
                self.low, self.high
            )));
        }
        if self.low > self.high {
            return Err(invalid(format!(
                "low {} is greater than high {}",
                self.low, self.high
            )));
        }
        Ok(())
    }
}

/// Ordered, evenly spaced, rounded candidate values for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRange {
    spec: RangeSpec,
    values: Vec<f64>,
}

impl ParameterRange {
    pub fn new(field: &str, spec: RangeSpec) -> Result<Self, ConfigError> {
        spec.validate(field)?;
        Ok(Self::linspace(spec))
    }

    /// Evenly spaced values with the last point pinned to `high`.
    fn linspace(spec: RangeSpec) -> Self {
        let RangeSpec { low, high, points } = spec;
        let values = match points {
            0 => Vec::new(),
            1 => vec![round_to_decimals(low, RANGE_DECIMALS)],
            _ => {
                let step = (high - low) / (points - 1) as f64;
                (0..points)
                    .map(|i| {
                        let raw = if i == points - 1 {
                            high
                        } else {
                            low + i as f64 * step
                        };
                        round_to_decimals(raw, RANGE_DECIMALS)
                    })
                    .collect()
            }
        };
        Self { spec, values }
    }

    pub fn spec(&self) -> RangeSpec {
        self.spec
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.values.iter().any(|candidate| *candidate == value)
    }
}

/// A single dimension of the parameter schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Field name as written in the ledger header (e.g. "match_to_match").
    pub name: String,
    /// Flag name passed to the aligner, without the leading dashes.
    pub flag: String,
    pub range: ParameterRange,
}

impl FieldSpec {
    /// Build a field whose flag is the kebab-case form of its name.
    pub fn new(name: impl Into<String>, spec: RangeSpec) -> Result<Self, ConfigError> {
        let name = name.into();
        let range = ParameterRange::new(&name, spec)?;
        Ok(Self {
            flag: kebab_case(&name),
            name,
            range,
        })
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flag = flag.into();
        self
    }
}

fn kebab_case(name: &str) -> String {
    name.replace('_', "-")
}

/// The two field layouts the aligner understands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    /// Seven transition/emission fields, no skip-loop entry probability.
    Seven,
    /// All eight fields, including `enter_skip_loop`.
    #[default]
    Eight,
}

impl SchemaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seven => "seven",
            Self::Eight => "eight",
        }
    }

    /// Preset `(name, low, high, points)` rows in schema order.
    fn preset_fields(&self) -> Vec<(&'static str, f64, f64, usize)> {
        let mut fields = vec![
            ("match_to_match", 0.85, 0.95, 11),
            ("match_to_ins", 0.01, 0.1, 10),
            ("ins_extend", 0.01, 0.1, 10),
            ("del_extend", 0.05, 0.15, 11),
            ("loop_prob", 0.5, 0.95, 10),
            ("skip_to_skip", 0.5, 0.95, 10),
            ("match_emit_correct", 0.5, 0.95, 10),
        ];
        if *self == Self::Eight {
            fields.insert(5, ("enter_skip_loop", 0.01, 0.3, 10));
        }
        fields
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "seven" | "7" => Ok(Self::Seven),
            "eight" | "8" => Ok(Self::Eight),
            other => Err(ConfigError::UnknownSchema {
                name: other.to_string(),
            }),
        }
    }
}

/// The full parameter space: an ordered list of field definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSchema {
    pub name: String,
    fields: Vec<FieldSpec>,
}

impl ParameterSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Result<Self, ConfigError> {
        let name = name.into();
        if fields.is_empty() {
            return Err(ConfigError::EmptySchema { schema: name });
        }
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ConfigError::DuplicateField {
                    field: field.name.clone(),
                });
            }
        }
        Ok(Self { name, fields })
    }

    pub fn preset(kind: SchemaKind) -> Self {
        let fields = kind
            .preset_fields()
            .into_iter()
            .map(|(name, low, high, points)| FieldSpec {
                name: name.to_string(),
                flag: kebab_case(name),
                range: ParameterRange::linspace(RangeSpec::new(low, high, points)),
            })
            .collect();
        Self {
            name: kind.as_str().to_string(),
            fields,
        }
    }

    /// Replace the ranges of named fields. Naming a field outside the
    /// schema is a configuration error.
    pub fn with_overrides(
        mut self,
        overrides: &BTreeMap<String, RangeSpec>,
    ) -> Result<Self, ConfigError> {
        for (field_name, spec) in overrides {
            let field = self
                .fields
                .iter_mut()
                .find(|field| &field.name == field_name)
                .ok_or_else(|| ConfigError::UnknownField {
                    field: field_name.clone(),
                })?;
            field.range = ParameterRange::new(field_name, *spec)?;
            tracing::debug!(
                field = %field_name,
                low = spec.low,
                high = spec.high,
                points = spec.points,
                "Range override applied"
            );
        }
        Ok(self)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of distinct configurations, `None` on overflow.
    pub fn space_size(&self) -> Option<usize> {
        self.fields
            .iter()
            .try_fold(1usize, |total, field| total.checked_mul(field.range.len()))
    }

    /// Whether every entry of `set` matches this schema's field order and
    /// lies inside the field's candidate values.
    pub fn admits(&self, set: &HyperparameterSet) -> bool {
        set.len() == self.fields.len()
            && self
                .fields
                .iter()
                .zip(set.entries())
                .all(|(field, entry)| field.name == entry.name && field.range.contains(entry.value))
    }
}

/// Create the sweep's generator. The same seed always yields the same stream.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Independent uniform sampling, with replacement, from every field's range.
#[derive(Debug, Clone)]
pub struct RandomSampler {
    schema: ParameterSchema,
}

impl RandomSampler {
    pub fn new(schema: ParameterSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    /// Draw one configuration. Fields consume generator state in schema order.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> HyperparameterSet {
        let entries = self
            .schema
            .fields
            .iter()
            .map(|field| {
                let values = field.range.values();
                let value = values[rng.gen_range(0..values.len())];
                ParameterEntry::new(field.name.clone(), field.flag.clone(), value)
            })
            .collect();
        HyperparameterSet::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_point_schema() -> ParameterSchema {
        ParameterSchema::new(
            "single",
            vec![FieldSpec::new("score_bias", RangeSpec::new(0.1, 0.2, 2)).unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn linspace_includes_both_endpoints() {
        let range = ParameterRange::new("match_to_match", RangeSpec::new(0.85, 0.95, 11)).unwrap();
        assert_eq!(range.len(), 11);
        assert_eq!(range.values()[0], 0.85);
        assert_eq!(range.values()[1], 0.86);
        assert_eq!(range.values()[10], 0.95);
    }

    #[test]
    fn linspace_rounds_to_four_decimals() {
        let range = ParameterRange::new("enter_skip_loop", RangeSpec::new(0.01, 0.3, 10)).unwrap();
        // step is 0.0322..., so the second point is 0.0422...
        assert_eq!(range.values()[1], 0.0422);
        for value in range.values() {
            assert_eq!(*value, round_to_decimals(*value, RANGE_DECIMALS));
        }
        assert_eq!(*range.values().last().unwrap(), 0.3);
    }

    #[test]
    fn linspace_rounds_ties_to_even() {
        let range = ParameterRange::new("x", RangeSpec::new(0.0, 0.001, 5)).unwrap();
        assert_eq!(range.values(), &[0.0, 0.0002, 0.0005, 0.0008, 0.001]);
        assert_eq!(round_to_decimals(2.5, 0), 2.0);
        assert_eq!(round_to_decimals(3.5, 0), 4.0);
    }

    #[test]
    fn single_point_range_is_low() {
        let range = ParameterRange::new("x", RangeSpec::new(0.25, 0.9, 1)).unwrap();
        assert_eq!(range.values(), &[0.25]);
    }

    #[test]
    fn malformed_ranges_are_rejected() {
        assert!(matches!(
            ParameterRange::new("x", RangeSpec::new(0.1, 0.2, 0)),
            Err(ConfigError::InvalidRange { .. })
        ));
        assert!(matches!(
            ParameterRange::new("x", RangeSpec::new(0.3, 0.2, 4)),
            Err(ConfigError::InvalidRange { .. })
        ));
        assert!(matches!(
            ParameterRange::new("x", RangeSpec::new(f64::NAN, 0.2, 4)),
            Err(ConfigError::InvalidRange { .. })
        ));
    }

    #[test]
    fn presets_have_expected_field_order() {
        let seven = ParameterSchema::preset(SchemaKind::Seven);
        assert_eq!(
            seven.field_names().collect::<Vec<_>>(),
            vec![
                "match_to_match",
                "match_to_ins",
                "ins_extend",
                "del_extend",
                "loop_prob",
                "skip_to_skip",
                "match_emit_correct",
            ]
        );

        let eight = ParameterSchema::preset(SchemaKind::Eight);
        assert_eq!(eight.len(), 8);
        assert_eq!(eight.fields()[5].name, "enter_skip_loop");
        assert_eq!(eight.fields()[5].flag, "enter-skip-loop");
    }

    #[test]
    fn schema_kind_parsing() {
        assert_eq!("7".parse::<SchemaKind>().unwrap(), SchemaKind::Seven);
        assert_eq!("Eight".parse::<SchemaKind>().unwrap(), SchemaKind::Eight);
        assert!(matches!(
            "nine".parse::<SchemaKind>(),
            Err(ConfigError::UnknownSchema { .. })
        ));
    }

    #[test]
    fn schema_rejects_duplicates_and_empty() {
        let field = FieldSpec::new("a", RangeSpec::new(0.0, 1.0, 3)).unwrap();
        assert!(matches!(
            ParameterSchema::new("dup", vec![field.clone(), field]),
            Err(ConfigError::DuplicateField { .. })
        ));
        assert!(matches!(
            ParameterSchema::new("none", Vec::new()),
            Err(ConfigError::EmptySchema { .. })
        ));
    }

    #[test]
    fn overrides_replace_ranges() {
        let mut overrides = BTreeMap::new();
        overrides.insert("loop_prob".to_string(), RangeSpec::new(0.6, 0.7, 2));
        let schema = ParameterSchema::preset(SchemaKind::Seven)
            .with_overrides(&overrides)
            .unwrap();
        let loop_prob = &schema.fields()[4];
        assert_eq!(loop_prob.range.values(), &[0.6, 0.7]);

        let mut unknown = BTreeMap::new();
        unknown.insert("enter_skip_loop".to_string(), RangeSpec::new(0.1, 0.2, 2));
        assert!(matches!(
            ParameterSchema::preset(SchemaKind::Seven).with_overrides(&unknown),
            Err(ConfigError::UnknownField { .. })
        ));
    }

    #[test]
    fn space_size_multiplies_point_counts() {
        let schema = ParameterSchema::preset(SchemaKind::Seven);
        assert_eq!(schema.space_size(), Some(11 * 10 * 10 * 11 * 10 * 10 * 10));
    }

    #[test]
    fn sampler_respects_ranges() {
        let schema = ParameterSchema::preset(SchemaKind::Eight);
        let sampler = RandomSampler::new(schema.clone());
        let mut rng = seeded_rng(100);
        for _ in 0..500 {
            let set = sampler.sample(&mut rng);
            assert!(schema.admits(&set), "out of range: {set}");
        }
    }

    #[test]
    fn sampler_is_reproducible_for_a_seed() {
        let sampler = RandomSampler::new(ParameterSchema::preset(SchemaKind::Eight));
        let draw = |seed| {
            let mut rng = seeded_rng(seed);
            (0..50).map(|_| sampler.sample(&mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(draw(100), draw(100));
        assert_ne!(draw(100), draw(101));
    }

    #[test]
    fn sampler_draws_both_points_of_small_range() {
        let sampler = RandomSampler::new(two_point_schema());
        let mut rng = seeded_rng(7);
        let drawn: HashSet<u64> = (0..64)
            .map(|_| sampler.sample(&mut rng).get("score_bias").unwrap().to_bits())
            .collect();
        assert_eq!(drawn.len(), 2);
    }
}
