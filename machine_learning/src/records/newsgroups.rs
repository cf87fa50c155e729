use std::collections::BTreeMap;

use super::{Record, RecordFactory, Schema, hashing::fnv1a};
use crate::{MlErr, Result};

/// The newsgroups of the 20 newsgroups dataset, a record's label is its position here.
pub const NEWSGROUPS: [&str; 20] = [
    "alt.atheism",
    "comp.graphics",
    "comp.os.ms-windows.misc",
    "comp.sys.ibm.pc.hardware",
    "comp.sys.mac.hardware",
    "comp.windows.x",
    "misc.forsale",
    "rec.autos",
    "rec.motorcycles",
    "rec.sport.baseball",
    "rec.sport.hockey",
    "sci.crypt",
    "sci.electronics",
    "sci.med",
    "sci.space",
    "soc.religion.christian",
    "talk.politics.guns",
    "talk.politics.mideast",
    "talk.politics.misc",
    "talk.religion.misc",
];

const INTERCEPT: usize = 0;

/// Parses `"<newsgroup>\t<text>"` lines.
///
/// Feature `0` is a constant intercept, every lower-cased alphanumeric word is hashed
/// into the remaining features with a value of `ln(1 + count)`.
pub struct TwentyNewsgroupsRecordFactory {
    schema: Schema,
}

impl TwentyNewsgroupsRecordFactory {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    fn label(&self, newsgroup: &str) -> Result<usize> {
        let label = NEWSGROUPS
            .iter()
            .position(|&g| g == newsgroup)
            .ok_or_else(|| MlErr::malformed(format!("unknown newsgroup `{newsgroup}`")))?;

        if label >= self.schema.categories {
            return Err(MlErr::LabelOutOfRange {
                label,
                categories: self.schema.categories,
            });
        }

        Ok(label)
    }

    fn bucket(&self, word: &str) -> Option<usize> {
        let buckets = self.schema.features.checked_sub(1).filter(|&b| b > 0)?;
        Some(1 + (fnv1a(word.as_bytes()) % buckets as u64) as usize)
    }
}

impl RecordFactory for TwentyNewsgroupsRecordFactory {
    fn parse(&self, raw: &str) -> Result<Record> {
        let (newsgroup, text) = raw
            .split_once('\t')
            .ok_or_else(|| MlErr::malformed("expected a tab between the newsgroup and the text"))?;

        let label = self.label(newsgroup.trim())?;

        let mut counts = BTreeMap::new();
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            if let Some(bucket) = self.bucket(&word.to_lowercase()) {
                *counts.entry(bucket).or_insert(0u32) += 1;
            }
        }

        let mut features = Vec::with_capacity(counts.len() + 1);
        features.push((INTERCEPT, 1.));
        features.extend(
            counts
                .into_iter()
                .map(|(bucket, count)| (bucket, (count as f32).ln_1p())),
        );

        Ok(Record::new(features, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> TwentyNewsgroupsRecordFactory {
        TwentyNewsgroupsRecordFactory::new(Schema::new(10_000, 20))
    }

    #[test]
    fn label_is_newsgroup_position() {
        let record = factory().parse("sci.space\tThe shuttle launched").unwrap();
        assert_eq!(record.label, 14);
        assert_eq!(record.features[0], (0, 1.));
    }

    #[test]
    fn words_are_case_insensitive_and_counted() {
        let record = factory().parse("rec.autos\tCar car CAR, engine!").unwrap();

        // intercept + "car" + "engine"
        assert_eq!(record.features.len(), 3);
        let value = |bucket| {
            record
                .features
                .iter()
                .find(|&&(i, _)| i == bucket)
                .map(|&(_, v)| v)
                .unwrap()
        };
        assert!((value(9063) - 3f32.ln_1p()).abs() < 1e-6);
        assert!((value(7480) - 1f32.ln_1p()).abs() < 1e-6);
    }

    #[test]
    fn same_text_same_features() {
        let a = factory().parse("misc.forsale\tbike for sale").unwrap();
        let b = factory().parse("misc.forsale\tBike for sale").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_unknown_newsgroup_and_missing_tab() {
        assert!(factory().parse("alt.nonsense\ttext").is_err());
        assert!(factory().parse("alt.atheism text without tab").is_err());
    }

    #[test]
    fn label_beyond_categories_is_out_of_range() {
        let factory = TwentyNewsgroupsRecordFactory::new(Schema::new(100, 2));
        let err = factory.parse("talk.religion.misc\tamen").unwrap_err();
        assert!(matches!(err, MlErr::LabelOutOfRange { label: 19, categories: 2 }));
    }

    #[test]
    fn single_feature_keeps_only_intercept() {
        let factory = TwentyNewsgroupsRecordFactory::new(Schema::new(1, 20));
        let record = factory.parse("alt.atheism\tsome words").unwrap();
        assert_eq!(record.features, vec![(0, 1.)]);
    }
}
