use crate::account_code::{normalize_prefix, AccountCode};
use crate::ingestion::{prepare_rows, PreparedRow};
use crate::schema::{AggregateField, ConsolidationConfig, FiscalAggregate, RawLedgerRow};
use crate::taxonomy::{Bucket, BucketSource, Taxonomy};
use crate::utils::round2;
use log::debug;

/// Balance of the first candidate code found in `rows`.
///
/// A candidate matches on the normalized code, or on the comma-normalized
/// raw code as a fallback. Empty candidates never match, not even rows
/// without a code. Returns `0.0` when nothing matches.
pub fn value_at<S: AsRef<str>>(rows: &[PreparedRow<'_>], codes: &[S]) -> f64 {
    for candidate in codes {
        let code = AccountCode::parse(candidate.as_ref());
        if code.is_empty() {
            continue;
        }
        let found = rows.iter().find(|row| {
            row.code.normalized == code.normalized || row.code.raw == code.raw
        });
        if let Some(row) = found {
            return row.balance;
        }
    }
    0.0
}

/// Sum of balances whose normalized code starts with any of `prefixes`.
///
/// Each row counts at most once. Empty prefixes are discarded; with no
/// usable prefix the sum is zero.
pub fn sum_by_prefixes<S: AsRef<str>>(
    rows: &[PreparedRow<'_>],
    prefixes: &[S],
    leaves_only: bool,
) -> f64 {
    let prefixes: Vec<String> = prefixes
        .iter()
        .map(|p| normalize_prefix(p.as_ref()))
        .filter(|p| !p.is_empty())
        .collect();

    if prefixes.is_empty() {
        return 0.0;
    }

    rows.iter()
        .filter(|row| !leaves_only || row.is_leaf)
        .filter(|row| prefixes.iter().any(|p| row.code.starts_with(p)))
        .map(|row| row.balance)
        .sum()
}

pub fn sum_by_predicate<F>(rows: &[PreparedRow<'_>], predicate: F) -> f64
where
    F: Fn(&PreparedRow<'_>) -> bool,
{
    rows.iter()
        .filter(|row| predicate(*row))
        .map(|row| row.balance)
        .sum()
}

/// Name heuristic for tax-credit accounts: the lowercased name mentions
/// `term` and at least one credit synonym.
pub fn is_credit_line<S: AsRef<str>>(row: &PreparedRow<'_>, term: &str, synonyms: &[S]) -> bool {
    row.name.contains(term) && synonyms.iter().any(|s| row.name.contains(s.as_ref()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevenueSource {
    /// The ledger carries a non-zero revenue total line.
    TotalLine,
    /// No total line; revenue was derived from its components.
    Derived,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevenueFigures {
    pub gross: f64,
    pub total: f64,
    pub source: RevenueSource,
}

/// Reads buckets and derived figures out of a prepared trial balance.
pub struct Resolver<'r, 'a> {
    rows: &'r [PreparedRow<'a>],
    taxonomy: &'r Taxonomy,
}

impl<'r, 'a> Resolver<'r, 'a> {
    pub fn new(rows: &'r [PreparedRow<'a>], taxonomy: &'r Taxonomy) -> Self {
        Self { rows, taxonomy }
    }

    pub fn bucket(&self, bucket: Bucket) -> f64 {
        match self.taxonomy.rule(bucket) {
            Some(source) => self.resolve_source(source),
            None => 0.0,
        }
    }

    fn resolve_source(&self, source: &BucketSource) -> f64 {
        match source {
            BucketSource::FirstOf { codes } => value_at(self.rows, codes.as_slice()),
            BucketSource::EachOf { codes } => codes
                .iter()
                .map(|code| value_at(self.rows, std::slice::from_ref(code)))
                .sum(),
            BucketSource::PrefixSum {
                prefixes,
                leaves_only,
            } => sum_by_prefixes(self.rows, prefixes.as_slice(), *leaves_only),
            BucketSource::NameMatch { term, synonyms } => {
                sum_by_predicate(self.rows, |row| {
                    is_credit_line(row, term, synonyms.as_slice())
                })
            }
        }
    }

    /// Gross and total revenue. The ledger's own total line wins when it is
    /// non-zero; otherwise both are derived, gross from the itemized sales
    /// buckets only and total adding financial and other revenue.
    pub fn revenue(&self) -> RevenueFigures {
        let total_line = self.bucket(Bucket::RevenueTotalLine);
        if total_line != 0.0 {
            return RevenueFigures {
                gross: total_line,
                total: total_line,
                source: RevenueSource::TotalLine,
            };
        }

        let gross = self.bucket(Bucket::GoodsRevenue)
            + self.bucket(Bucket::ServicesRevenue)
            + self.bucket(Bucket::ExportRevenue);
        let total =
            gross + self.bucket(Bucket::FinancialRevenue) + self.bucket(Bucket::OtherRevenue);

        RevenueFigures {
            gross,
            total,
            source: RevenueSource::Derived,
        }
    }

    pub fn resolve(&self) -> FiscalAggregate {
        let goods_revenue = self.bucket(Bucket::GoodsRevenue);
        let services_revenue = self.bucket(Bucket::ServicesRevenue);
        let export_revenue = self.bucket(Bucket::ExportRevenue);
        let deductions =
            self.bucket(Bucket::GrossDeductions) - self.bucket(Bucket::SimplesWithheld);
        let financial_revenue = self.bucket(Bucket::FinancialRevenue);

        let revenue = self.revenue();
        debug!(
            "Revenue resolved from {:?}: gross={}, total={}",
            revenue.source, revenue.gross, revenue.total
        );
        let revenue_residual = revenue.total - (goods_revenue + services_revenue);

        let goods_cost = self.bucket(Bucket::GoodsCost);
        let services_cost = self.bucket(Bucket::ServicesCost);
        let cost_total = self.bucket(Bucket::CostTotalLine);
        // Residuals may go negative when prefixes overlap the total line.
        let cost_residual = cost_total - (goods_cost + services_cost);

        let payroll = self.bucket(Bucket::Payroll);
        let employer_inss = self.bucket(Bucket::EmployerInss);
        let operating = self.bucket(Bucket::OperatingExpenses);
        let expense_total = self.bucket(Bucket::ExpenseTotalLine);
        let expense_residual = expense_total - (operating + payroll + employer_inss);

        let figures = [
            (AggregateField::TotalRevenue, revenue.total),
            (AggregateField::GrossRevenue, revenue.gross),
            (AggregateField::GoodsRevenue, goods_revenue),
            (AggregateField::ServicesRevenue, services_revenue),
            (AggregateField::ExportRevenue, export_revenue),
            (AggregateField::FinancialRevenue, financial_revenue),
            (AggregateField::OtherRevenues, revenue_residual),
            (AggregateField::RevenueDeductions, deductions),
            (AggregateField::RevenueOther, revenue_residual),
            (AggregateField::TotalCost, cost_total),
            (AggregateField::GoodsCost, goods_cost),
            (AggregateField::ServicesCost, services_cost),
            (AggregateField::OtherCost, cost_residual),
            (AggregateField::TotalPayroll, payroll),
            (AggregateField::EmployerInss, employer_inss),
            (AggregateField::OperatingExpenses, operating),
            (AggregateField::OtherExpenses, expense_residual),
            (AggregateField::PisCredits, self.bucket(Bucket::PisCredits)),
            (AggregateField::CofinsCredits, self.bucket(Bucket::CofinsCredits)),
        ];

        let mut aggregate = FiscalAggregate::empty();
        for (field, value) in figures {
            aggregate.insert(field, round2(value));
        }
        aggregate
    }
}

/// Consolidates raw ledger rows under `config`. No rows means an empty
/// aggregate.
pub fn consolidate_rows(rows: &[RawLedgerRow], config: &ConsolidationConfig) -> FiscalAggregate {
    let prepared = prepare_rows(rows, &config.value_fields);
    if prepared.is_empty() {
        debug!("No ledger rows to consolidate");
        return FiscalAggregate::empty();
    }

    debug!("Consolidating {} ledger rows", prepared.len());
    Resolver::new(&prepared, &config.taxonomy).resolve()
}
