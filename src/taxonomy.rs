use crate::error::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Substrings that mark an account name as a recoverable/offsettable tax
/// credit. Both accented and unaccented spellings occur in real charts.
pub const CREDIT_SYNONYMS: [&str; 4] = ["crédito", "credito", "recuper", "compens"];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    #[schemars(description = "Top-level revenue total line (group 03)")]
    RevenueTotalLine,
    #[schemars(description = "Revenue from goods, read from aggregator lines")]
    GoodsRevenue,
    #[schemars(description = "Revenue from services, read from aggregator lines")]
    ServicesRevenue,
    #[schemars(description = "Export revenue, read from aggregator lines")]
    ExportRevenue,
    #[schemars(description = "Revenue deductions before removing the Simples Nacional line")]
    GrossDeductions,
    #[schemars(description = "Simples Nacional withheld on sales and services (excluded from deductions)")]
    SimplesWithheld,
    FinancialRevenue,
    #[schemars(description = "Other operating revenue (group 03.2), used only to derive the total")]
    OtherRevenue,
    CostTotalLine,
    GoodsCost,
    ServicesCost,
    ExpenseTotalLine,
    Payroll,
    EmployerInss,
    OperatingExpenses,
    PisCredits,
    CofinsCredits,
}

/// How a bucket reads its value from the prepared rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BucketSource {
    #[schemars(description = "Exact lookup: the balance of the first listed code present in the ledger.")]
    FirstOf { codes: Vec<String> },

    #[schemars(
        description = "Exact lookup of every listed code, summed. Use for aggregator lines whose children must not be counted again."
    )]
    EachOf { codes: Vec<String> },

    #[schemars(description = "Sum of rows whose normalized code starts with any listed prefix.")]
    PrefixSum {
        prefixes: Vec<String>,
        #[serde(default = "default_leaves_only")]
        leaves_only: bool,
    },

    #[schemars(
        description = "Sum of rows whose lowercased name contains the term and at least one synonym."
    )]
    NameMatch {
        term: String,
        #[serde(default = "default_synonyms")]
        synonyms: Vec<String>,
    },
}

fn default_leaves_only() -> bool {
    true
}

fn default_synonyms() -> Vec<String> {
    CREDIT_SYNONYMS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BucketRule {
    pub bucket: Bucket,
    #[serde(flatten)]
    pub source: BucketSource,
}

/// Chart-of-accounts taxonomy: which ledger accounts feed each bucket.
///
/// The default is the standard chart used by the SCI ledger exports.
/// A bucket without a rule resolves to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Taxonomy {
    pub rules: Vec<BucketRule>,
}

impl Taxonomy {
    pub fn rule(&self, bucket: Bucket) -> Option<&BucketSource> {
        self.rules
            .iter()
            .find(|rule| rule.bucket == bucket)
            .map(|rule| &rule.source)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Taxonomy)
    }
}

fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

fn first_of(bucket: Bucket, list: &[&str]) -> BucketRule {
    BucketRule {
        bucket,
        source: BucketSource::FirstOf { codes: codes(list) },
    }
}

fn each_of(bucket: Bucket, list: &[&str]) -> BucketRule {
    BucketRule {
        bucket,
        source: BucketSource::EachOf { codes: codes(list) },
    }
}

fn leaves(bucket: Bucket, list: &[&str]) -> BucketRule {
    BucketRule {
        bucket,
        source: BucketSource::PrefixSum {
            prefixes: codes(list),
            leaves_only: true,
        },
    }
}

fn credits(bucket: Bucket, term: &str) -> BucketRule {
    BucketRule {
        bucket,
        source: BucketSource::NameMatch {
            term: term.to_string(),
            synonyms: default_synonyms(),
        },
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            rules: vec![
                first_of(Bucket::RevenueTotalLine, &["03", "3"]),
                each_of(Bucket::GoodsRevenue, &["03.1.1.01", "03.1.1.05", "03.1.1.06"]),
                each_of(Bucket::ServicesRevenue, &["03.1.1.03"]),
                each_of(Bucket::ExportRevenue, &["03.1.1.02", "03.1.1.04"]),
                leaves(Bucket::GrossDeductions, &["03.1.2"]),
                first_of(Bucket::SimplesWithheld, &["03.1.2.02.008"]),
                leaves(Bucket::FinancialRevenue, &["03.1.3"]),
                leaves(Bucket::OtherRevenue, &["03.2"]),
                first_of(Bucket::CostTotalLine, &["04.1", "4.1"]),
                leaves(Bucket::GoodsCost, &["04.1.1", "04.1.2"]),
                leaves(Bucket::ServicesCost, &["04.1.3"]),
                first_of(Bucket::ExpenseTotalLine, &["04.2", "4.2"]),
                leaves(Bucket::Payroll, &["04.2.1.01"]),
                leaves(Bucket::EmployerInss, &["04.2.1.02"]),
                leaves(
                    Bucket::OperatingExpenses,
                    &[
                        "04.2.1.03",
                        "04.2.1.04",
                        "04.2.1.05",
                        "04.2.1.06",
                        "04.2.1.07",
                        "04.2.10",
                        "04.2.2",
                        "04.2.3",
                        "04.2.4",
                        "04.2.5",
                        "04.2.6",
                        "04.2.7",
                        "04.2.8",
                        "04.2.9",
                    ],
                ),
                credits(Bucket::PisCredits, "pis"),
                credits(Bucket::CofinsCredits, "cofins"),
            ],
        }
    }
}
