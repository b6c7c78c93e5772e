use balancete_consolidator::*;
use serde_json::{json, Value};

const TRIAL_BALANCE_CSV: &str = "\
bdctalon;bdnomcta;bdtipcta;bdsaldo_atual;bdmovimento
03;RECEITAS;0;12.500,00;1.500,00
03.1.1.01;Venda de mercadorias;0;7.000,00;800,00
03.1.1.01.001;Venda a vista;1;7.000,00;800,00
03.1.1.03;Prestacao de servicos;0;4.000,00;500,00
03.1.1.03.001;Servicos prestados;1;4.000,00;500,00
03.1.2.01.001;Devolucoes de vendas;1;300,00;30,00
03.1.2.02.008;Simples Nacional sobre vendas;1;700,00;90,00
03.1.3.01;Rendimentos de aplicacao;1;1.000,00;150,00
03.2.1;Outras receitas operacionais;1;500,00;50,00
04.1;CUSTOS;0;5.200,00;600,00
04.1.1.01;CMV;1;4.000,00;450,00
04.1.3.01;Custo dos servicos;1;1.000,00;100,00
04.2;DESPESAS;0;3.800,00;420,00
04.2.1.01.001;Salarios;1;2.000,00;200,00
04.2.1.02.001;INSS patronal;1;400,00;40,00
04.2.2.01;Aluguel;1;900,00;100,00
04.2.10.01;Despesas bancarias;1;100,00;10,00
01.1.5.01;PIS a Recuperar;1;45,00;5,00
01.1.5.02;Cofins a recuperar;1;207,50;23,00
01.1.5.03;Credito de COFINS sobre insumos;1;12,50;2,00
";

fn load_csv(text: &str) -> anyhow::Result<Vec<RawLedgerRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = headers
            .iter()
            .zip(record.iter())
            .fold(RawLedgerRow::new(), |row, (key, value)| row.with(key, value));
        rows.push(row);
    }
    Ok(rows)
}

fn assert_close(aggregate: &FiscalAggregate, field: AggregateField, expected: f64) {
    let actual = aggregate
        .get(field)
        .unwrap_or_else(|| panic!("{} missing from aggregate", field));
    assert!(
        (actual - expected).abs() < 0.001,
        "{} should be {}, got {}",
        field,
        expected,
        actual
    );
}

fn reference_scenario() -> Value {
    json!([
        { "bdctalon": "03", "bdsaldo_atual": "1.000,00", "bdtipcta": 0 },
        { "bdctalon": "03.1.1.01", "bdsaldo_atual": "600,00", "bdtipcta": 1 },
        { "bdctalon": "03.1.1.03", "bdsaldo_atual": "400,00", "bdtipcta": 1 },
        { "bdctalon": "04.1", "bdsaldo_atual": "300,00", "bdtipcta": 0 },
        { "bdctalon": "04.1.1", "bdsaldo_atual": "300,00", "bdtipcta": 1 },
        { "bdctalon": "04.2.1.01", "bdsaldo_atual": "120,00", "bdtipcta": 1 },
        { "bdctalon": "01.1.5.01", "bdnomcta": "pis a recuperar", "bdsaldo_atual": "10,00", "bdtipcta": 1 }
    ])
}

#[test]
fn test_full_trial_balance_from_csv() -> anyhow::Result<()> {
    let rows = load_csv(TRIAL_BALANCE_CSV)?;
    let aggregate = consolidate(&rows);

    assert_close(&aggregate, AggregateField::TotalRevenue, 12_500.0);
    assert_close(&aggregate, AggregateField::GrossRevenue, 12_500.0);
    assert_close(&aggregate, AggregateField::GoodsRevenue, 7_000.0);
    assert_close(&aggregate, AggregateField::ServicesRevenue, 4_000.0);
    assert_close(&aggregate, AggregateField::ExportRevenue, 0.0);
    assert_close(&aggregate, AggregateField::FinancialRevenue, 1_000.0);
    assert_close(&aggregate, AggregateField::RevenueDeductions, 300.0);
    assert_close(&aggregate, AggregateField::RevenueOther, 1_500.0);
    assert_close(&aggregate, AggregateField::OtherRevenues, 1_500.0);

    assert_close(&aggregate, AggregateField::TotalCost, 5_200.0);
    assert_close(&aggregate, AggregateField::GoodsCost, 4_000.0);
    assert_close(&aggregate, AggregateField::ServicesCost, 1_000.0);
    assert_close(&aggregate, AggregateField::OtherCost, 200.0);

    assert_close(&aggregate, AggregateField::TotalPayroll, 2_000.0);
    assert_close(&aggregate, AggregateField::EmployerInss, 400.0);
    assert_close(&aggregate, AggregateField::OperatingExpenses, 1_000.0);
    assert_close(&aggregate, AggregateField::OtherExpenses, 400.0);

    assert_close(&aggregate, AggregateField::PisCredits, 45.0);
    assert_close(&aggregate, AggregateField::CofinsCredits, 220.0);

    Ok(())
}

#[test]
fn test_period_movement_from_csv() -> anyhow::Result<()> {
    let rows = load_csv(TRIAL_BALANCE_CSV)?;
    let aggregate = consolidate_with(&rows, &["bdmovimento"][..]);

    assert_close(&aggregate, AggregateField::TotalRevenue, 1_500.0);
    assert_close(&aggregate, AggregateField::GoodsRevenue, 800.0);
    assert_close(&aggregate, AggregateField::TotalPayroll, 200.0);
    assert_close(&aggregate, AggregateField::PisCredits, 5.0);

    Ok(())
}

#[test]
fn test_documented_scenario() {
    let aggregate = consolidate_value(&reference_scenario(), &ConsolidationConfig::default());

    assert_close(&aggregate, AggregateField::TotalRevenue, 1_000.0);
    assert_close(&aggregate, AggregateField::GrossRevenue, 1_000.0);
    assert_close(&aggregate, AggregateField::GoodsRevenue, 600.0);
    assert_close(&aggregate, AggregateField::ServicesRevenue, 400.0);
    assert_close(&aggregate, AggregateField::RevenueOther, 0.0);
    assert_close(&aggregate, AggregateField::TotalCost, 300.0);
    assert_close(&aggregate, AggregateField::GoodsCost, 300.0);
    assert_close(&aggregate, AggregateField::OtherCost, 0.0);
    assert_close(&aggregate, AggregateField::TotalPayroll, 120.0);
    assert_close(&aggregate, AggregateField::PisCredits, 10.0);
    assert_close(&aggregate, AggregateField::CofinsCredits, 0.0);
}

#[test]
fn test_total_line_versus_derived_revenue() {
    let mut with_total = reference_scenario();
    if let Value::Array(items) = &mut with_total {
        items.push(json!({ "bdctalon": "03.2.1", "bdsaldo_atual": "250,00", "bdtipcta": 1 }));
        items.push(json!({ "bdctalon": "03.1.3.01", "bdsaldo_atual": "50,00", "bdtipcta": 1 }));
        // The ledger's own total now includes the extra revenue.
        items[0] = json!({ "bdctalon": "03", "bdsaldo_atual": "1.300,00", "bdtipcta": 0 });
    }

    let mut without_total = with_total.clone();
    if let Value::Array(items) = &mut without_total {
        items.remove(0);
    }

    let config = ConsolidationConfig::default();
    let rows_with = rows_from_value(&with_total);
    let rows_without = rows_from_value(&without_total);

    let prepared_with = prepare_rows(&rows_with, &config.value_fields);
    let prepared_without = prepare_rows(&rows_without, &config.value_fields);
    let exact = Resolver::new(&prepared_with, &config.taxonomy).revenue();
    let derived = Resolver::new(&prepared_without, &config.taxonomy).revenue();

    assert_eq!(exact.source, RevenueSource::TotalLine);
    assert_eq!(derived.source, RevenueSource::Derived);

    // Gross revenue falls back to goods + services + exports only.
    assert!((exact.gross - 1_300.0).abs() < 0.001);
    assert!((derived.gross - 1_000.0).abs() < 0.001);
    assert!(exact.gross > derived.gross);

    // Total revenue adds financial and other revenue back.
    assert!((derived.total - 1_300.0).abs() < 0.001);

    let aggregate = consolidate(&rows_without);
    assert_close(&aggregate, AggregateField::GrossRevenue, 1_000.0);
    assert_close(&aggregate, AggregateField::TotalRevenue, 1_300.0);
    assert_close(&aggregate, AggregateField::RevenueOther, 300.0);
}

#[test]
fn test_itemized_sales_and_exports_without_total_line() {
    let rows = rows_from_value(&json!([
        { "bdctalon": "03.1.1.01", "bdsaldo_atual": "100,00", "bdtipcta": 0 },
        { "bdctalon": "03.1.1.05", "bdsaldo_atual": "20,00", "bdtipcta": 0 },
        { "bdctalon": "03.1.1.05.001", "bdsaldo_atual": "20,00", "bdtipcta": 1 },
        { "bdctalon": "03.1.1.06", "bdsaldo_atual": "3,00", "bdtipcta": 1 },
        { "bdctalon": "03.1.1.03", "bdsaldo_atual": "50,00", "bdtipcta": 1 },
        { "bdctalon": "03.1.1.02", "bdsaldo_atual": "5,00", "bdtipcta": 1 },
        { "bdctalon": "03.1.1.04", "bdsaldo_atual": "3,00", "bdtipcta": 1 }
    ]));

    let aggregate = consolidate(&rows);

    // Aggregator lines are read once each; the child of 03.1.1.05 is not added again.
    assert_close(&aggregate, AggregateField::GoodsRevenue, 123.0);
    assert_close(&aggregate, AggregateField::ServicesRevenue, 50.0);
    assert_close(&aggregate, AggregateField::ExportRevenue, 8.0);
    assert_close(&aggregate, AggregateField::GrossRevenue, 181.0);
    assert_close(&aggregate, AggregateField::TotalRevenue, 181.0);
    assert_close(&aggregate, AggregateField::RevenueOther, 8.0);
}

#[test]
fn test_consolidation_is_pure() {
    let rows = rows_from_value(&reference_scenario());
    let snapshot = rows.clone();

    let first = consolidate(&rows);
    let second = consolidate(&rows);

    assert_eq!(rows, snapshot);
    for field in AggregateField::ALL {
        let a = first.get(field).unwrap();
        let b = second.get(field).unwrap();
        assert_eq!(a.to_bits(), b.to_bits(), "{} differs between runs", field);
    }
}

#[test]
fn test_rounding_to_two_decimals() {
    let rows = rows_from_value(&json!([
        { "bdctalon": "04.2.1.01.001", "bdsaldo_atual": 33.333, "bdtipcta": 1 },
        { "bdctalon": "04.1", "bdsaldo_atual": "10,006", "bdtipcta": 0 }
    ]));
    let aggregate = consolidate(&rows);

    assert_eq!(aggregate.get(AggregateField::TotalPayroll), Some(33.33));
    assert_close(&aggregate, AggregateField::TotalCost, 10.01);

    for (_, value) in aggregate.iter() {
        assert!(value.is_finite());
        assert!(((value * 100.0).round() - value * 100.0).abs() < 1e-6);
    }
}

#[test]
fn test_non_leaf_rows_never_enter_prefix_sums() {
    let leaf = json!({ "bdctalon": "04.2.2.01", "bdsaldo_atual": "80,00", "bdtipcta": 1 });
    let aggregator = json!({ "bdctalon": "04.2.2", "bdsaldo_atual": "80,00", "bdtipcta": 0 });
    let negative_type = json!({ "bdctalon": "04.2.3", "bdsaldo_atual": "5,00", "bdtipcta": -1 });

    let all = consolidate_value(
        &json!([leaf.clone(), aggregator.clone(), negative_type.clone()]),
        &ConsolidationConfig::default(),
    );
    let without_leaf = consolidate_value(
        &json!([aggregator, negative_type]),
        &ConsolidationConfig::default(),
    );

    assert_close(&all, AggregateField::OperatingExpenses, 80.0);
    assert_close(&without_leaf, AggregateField::OperatingExpenses, 0.0);
}

#[test]
fn test_malformed_rows_degrade_to_zero() {
    let aggregate = consolidate_value(
        &json!([
            { "bdctalon": null, "bdsaldo_atual": "n/a" },
            { "bdcodcta": "04,2,1,01", "bdsaldo_atual": "12,5", "bdtipcta": "1" },
            "not a row",
            { "bdctalon": "03..1", "bdsaldo_atual": {}, "bdtipcta": 1 }
        ]),
        &ConsolidationConfig::default(),
    );

    assert_eq!(aggregate.len(), AggregateField::ALL.len());
    assert_close(&aggregate, AggregateField::TotalPayroll, 12.5);
    assert_close(&aggregate, AggregateField::TotalRevenue, 0.0);
}

#[test]
fn test_custom_taxonomy_from_json() -> anyhow::Result<()> {
    let taxonomy = Taxonomy::from_json(
        r#"{
            "rules": [
                { "bucket": "revenue_total_line", "strategy": "first_of", "codes": ["3"] },
                { "bucket": "goods_revenue", "strategy": "prefix_sum", "prefixes": ["3.1"], "leaves_only": false },
                { "bucket": "pis_credits", "strategy": "name_match", "term": "pis", "synonyms": ["a recuperar"] }
            ]
        }"#,
    )?;
    let config = ConsolidationConfig {
        taxonomy,
        ..ConsolidationConfig::default()
    };

    let aggregate = consolidate_value(
        &json!([
            { "bdctalon": "3.1", "bdsaldo_atual": 40.0 },
            { "bdctalon": "3.1.1", "bdsaldo_atual": 60.0 },
            { "bdctalon": "1.5", "bdnomcta": "PIS a recuperar", "bdsaldo_atual": 3.0 },
            { "bdctalon": "1.6", "bdnomcta": "Credito de PIS", "bdsaldo_atual": 9.0 }
        ]),
        &config,
    );

    assert_close(&aggregate, AggregateField::GoodsRevenue, 100.0);
    assert_close(&aggregate, AggregateField::PisCredits, 3.0);
    assert_close(&aggregate, AggregateField::TotalPayroll, 0.0);
    Ok(())
}

#[test]
fn test_config_from_json() -> anyhow::Result<()> {
    let config: ConsolidationConfig =
        serde_json::from_str(r#"{ "value_fields": ["bdmovimento"] }"#)?;
    let keys: Vec<&str> = config.value_fields.candidates().collect();
    assert_eq!(keys, vec!["bdmovimento", DEFAULT_VALUE_KEY]);
    assert_eq!(config.taxonomy, Taxonomy::default());
    Ok(())
}

#[test]
fn test_import_from_service_payload() -> anyhow::Result<()> {
    let payload = json!({
        "empresa": 315,
        "empresa_detalhes": {
            "codigo": 315,
            "razao_social": "Silveira Comercio de Alimentos Ltda",
            "cnpj": "12.345.678/0001-90",
            "cnae": "4711302",
            "cod_cidade": 3106200,
            "municipio": "Belo Horizonte"
        },
        "plano_contas": "12",
        "intervalo_contas": { "inicio": 1, "fim": 99999 },
        "periodo": { "inicio": "01.01.2024", "fim": "31.12.2024", "referencia": "202412" },
        "total_registros": 7,
        "dados": reference_scenario()
    });
    let envelope = BalanceteEnvelope::from_value(payload)?;

    let imported = import_balancete(&envelope, ConsolidationConfig::default(), Some("LP"))?;

    assert_eq!(imported.company.razao_social, "Silveira Comercio de Alimentos Ltda");
    assert_eq!(imported.company.cnpj, "12345678000190");
    assert_eq!(imported.regime, Some(TaxRegime::Presumido));
    assert_close(&imported.aggregate, AggregateField::TotalRevenue, 1_000.0);

    let mut form = std::collections::BTreeMap::new();
    form.insert("receita_total".to_string(), String::new());
    form.insert("creditos_pis".to_string(), String::new());
    let filled = prefill_form(&imported.aggregate, &form);
    assert_eq!(filled["receita_total"], "1.000,00");
    assert_eq!(filled["creditos_pis"], "10,00");

    assert_eq!(
        format_ledger_date(envelope.periodo.start_date()?),
        "01.01.2024"
    );
    Ok(())
}

#[test]
fn test_import_without_company_data_fails() {
    let envelope = BalanceteEnvelope {
        dados: rows_from_value(&reference_scenario()),
        ..BalanceteEnvelope::default()
    };
    let result = import_balancete(&envelope, ConsolidationConfig::default(), None);
    assert!(matches!(result, Err(ConsolidationError::MissingCnpj)));
}
