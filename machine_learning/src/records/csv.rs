use super::{Record, RecordFactory, Schema};
use crate::{MlErr, Result};

/// Parses dense `"<label>,<x0>,<x1>,..."` lines, zero valued features are left out.
pub struct CsvRecordFactory {
    schema: Schema,
}

impl CsvRecordFactory {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }
}

impl RecordFactory for CsvRecordFactory {
    fn parse(&self, raw: &str) -> Result<Record> {
        let mut fields = raw.split(',').map(str::trim);

        let label = fields
            .next()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| MlErr::malformed("empty csv record"))?;
        let label = label
            .parse()
            .map_err(|_| MlErr::malformed(format!("invalid label `{label}`")))?;

        let mut features = Vec::new();
        for (index, field) in fields.enumerate() {
            if index >= self.schema.features {
                return Err(MlErr::FeatureOutOfRange {
                    index,
                    features: self.schema.features,
                });
            }

            let value: f32 = field
                .parse()
                .ok()
                .filter(|v: &f32| v.is_finite())
                .ok_or_else(|| MlErr::malformed(format!("invalid value `{field}` at column {index}")))?;

            if value != 0. {
                features.push((index, value));
            }
        }

        let record = Record::new(features, label);
        self.schema.check(&record)?;
        Ok(record)
    }
}
