use super::{Record, RecordFactory, Schema};
use crate::{MlErr, Result};

/// Parses `"<label> <index>:<value> ..."` lines with 1-based feature indices,
/// anything after a `#` is a comment.
pub struct LibsvmRecordFactory {
    schema: Schema,
}

impl LibsvmRecordFactory {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    fn feature(token: &str) -> Result<(usize, f32)> {
        let (index, value) = token
            .split_once(':')
            .ok_or_else(|| MlErr::malformed(format!("expected `index:value`, got `{token}`")))?;

        let index: usize = index
            .parse()
            .ok()
            .filter(|&i| i > 0)
            .ok_or_else(|| MlErr::malformed(format!("invalid 1-based index `{index}`")))?;

        let value = value
            .parse()
            .ok()
            .filter(|v: &f32| v.is_finite())
            .ok_or_else(|| MlErr::malformed(format!("invalid value `{value}`")))?;

        Ok((index - 1, value))
    }
}

impl RecordFactory for LibsvmRecordFactory {
    fn parse(&self, raw: &str) -> Result<Record> {
        let line = raw.split_once('#').map_or(raw, |(line, _)| line);
        let mut tokens = line.split_whitespace();

        let label = tokens
            .next()
            .ok_or_else(|| MlErr::malformed("empty libsvm record"))?;
        let label = label
            .parse()
            .map_err(|_| MlErr::malformed(format!("invalid label `{label}`")))?;

        let features = tokens.map(Self::feature).collect::<Result<Vec<_>>>()?;

        let record = Record::new(features, label);
        self.schema.check(&record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> LibsvmRecordFactory {
        LibsvmRecordFactory::new(Schema::new(4, 3))
    }

    #[test]
    fn indices_are_one_based() {
        let record = factory().parse("2 1:0.5 4:1.5").unwrap();
        assert_eq!(record, Record::new(vec![(0, 0.5), (3, 1.5)], 2));
    }

    #[test]
    fn comments_are_ignored() {
        let record = factory().parse("0 2:1 # a comment 3:9").unwrap();
        assert_eq!(record, Record::new(vec![(1, 1.)], 0));
    }

    #[test]
    fn rejects_bad_records() {
        assert!(factory().parse("   ").is_err());
        assert!(factory().parse("1 0:1").is_err());
        assert!(factory().parse("1 2").is_err());
        assert!(factory().parse("1 2:inf").is_err());
        assert!(matches!(factory().parse("1 5:1"), Err(MlErr::FeatureOutOfRange { index: 4, .. })));
        assert!(matches!(factory().parse("3 1:1"), Err(MlErr::LabelOutOfRange { .. })));
    }
}
