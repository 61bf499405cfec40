use crate::config::ExtractConfig;
use crate::driver::{DriverError, PageDriver};
use crate::extract::{self, ExtractionResult, FieldSpec};
use crate::utils::settle;
use serde::{Deserialize, Serialize};

/// One extracted field on a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub name: String,
    pub value: ExtractionResult,
}

/// The unit of output: one record per visited page, with one result per
/// configured field. Immutable once assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    pub url: String,
    pub fields: Vec<ExtractedField>,
}

impl ContentRecord {
    /// A record whose every field is absent, emitted when a page could not
    /// be visited at all so the 1:1 input/output mapping still holds.
    pub fn all_absent(url: &str, specs: &[FieldSpec]) -> Self {
        Self {
            url: url.to_string(),
            fields: specs
                .iter()
                .map(|spec| ExtractedField {
                    name: spec.name.clone(),
                    value: ExtractionResult::Absent,
                })
                .collect(),
        }
    }

    /// The result for a named field, if the schema includes it.
    pub fn field(&self, name: &str) -> Option<&ExtractionResult> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }

    /// True when no field resolved at all.
    pub fn is_empty_content(&self) -> bool {
        self.fields.iter().all(|field| field.value.is_absent())
    }
}

/// Outcome of a harvest batch. `fatal` is set when the driver became
/// unusable mid-batch; the records assembled before that are kept so the
/// caller can still persist them.
#[derive(Debug)]
pub struct HarvestReport {
    pub records: Vec<ContentRecord>,
    pub fatal: Option<DriverError>,
}

impl HarvestReport {
    pub fn is_complete(&self) -> bool {
        self.fatal.is_none()
    }
}

/// Visit each identifier in input order and assemble one record per page.
///
/// A navigation failure for one identifier yields an all-absent record and
/// the batch continues; only a lost browser session stops the batch.
pub async fn harvest<D: PageDriver>(
    driver: &mut D,
    identifiers: &[String],
    config: &ExtractConfig,
) -> HarvestReport {
    let mut records = Vec::with_capacity(identifiers.len());

    for (index, url) in identifiers.iter().enumerate() {
        ::log::info!("visiting page {}/{}: {}", index + 1, identifiers.len(), url);

        if let Err(e) = driver.navigate(url).await {
            if e.is_session_lost() {
                ::log::error!(
                    "browser session lost at {}; stopping with {} records assembled: {}",
                    url,
                    records.len(),
                    e
                );
                return HarvestReport {
                    records,
                    fatal: Some(e),
                };
            }
            ::log::warn!("navigation to {} failed, emitting empty record: {}", url, e);
            records.push(ContentRecord::all_absent(url, &config.fields));
            continue;
        }
        settle(config.page_settle()).await;

        let mut fields = Vec::with_capacity(config.fields.len());
        for spec in &config.fields {
            let value = extract::extract(driver, spec).await;
            fields.push(ExtractedField {
                name: spec.name.clone(),
                value,
            });
        }

        let record = ContentRecord {
            url: url.clone(),
            fields,
        };
        if record.is_empty_content() {
            ::log::warn!("no fields resolved for {}, record flagged as empty", url);
        }
        records.push(record);
    }

    ::log::info!("harvest finished: {} records", records.len());
    HarvestReport {
        records,
        fatal: None,
    }
}
