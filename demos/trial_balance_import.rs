use balancete_consolidator::{
    format_brl, import_balancete, AggregateField, BalanceteEnvelope, ConsolidationConfig,
};
use serde_json::json;

fn main() {
    let payload = json!({
        "empresa": 315,
        "empresa_detalhes": {
            "razao_social": "Silveira Comercio de Alimentos Ltda",
            "cnpj": "12.345.678/0001-90",
            "cnae": "4711302",
            "municipio": "Belo Horizonte"
        },
        "plano_contas": "12",
        "periodo": { "inicio": "01.01.2024", "fim": "31.03.2024", "referencia": "202403" },
        "total_registros": 8,
        "dados": [
            { "bdctalon": "03", "bdnomcta": "RECEITAS", "bdtipcta": 0, "bdsaldo_atual": "95.000,00", "bdmovimento": "31.000,00" },
            { "bdctalon": "03.1.1.01", "bdnomcta": "Venda de mercadorias", "bdtipcta": 0, "bdsaldo_atual": "70.000,00", "bdmovimento": "23.000,00" },
            { "bdctalon": "03.1.1.03", "bdnomcta": "Prestacao de servicos", "bdtipcta": 0, "bdsaldo_atual": "25.000,00", "bdmovimento": "8.000,00" },
            { "bdctalon": "04.1", "bdnomcta": "CUSTOS", "bdtipcta": 0, "bdsaldo_atual": "42.000,00", "bdmovimento": "14.000,00" },
            { "bdctalon": "04.1.1.01", "bdnomcta": "CMV", "bdtipcta": 1, "bdsaldo_atual": "42.000,00", "bdmovimento": "14.000,00" },
            { "bdctalon": "04.2.1.01.001", "bdnomcta": "Salarios", "bdtipcta": 1, "bdsaldo_atual": "18.000,00", "bdmovimento": "6.000,00" },
            { "bdctalon": "04.2.1.02.001", "bdnomcta": "INSS", "bdtipcta": 1, "bdsaldo_atual": "3.600,00", "bdmovimento": "1.200,00" },
            { "bdctalon": "01.1.5.01", "bdnomcta": "PIS a Recuperar", "bdtipcta": 1, "bdsaldo_atual": "310,00", "bdmovimento": "100,00" }
        ]
    });

    let envelope = BalanceteEnvelope::from_value(payload).expect("payload should parse");

    let accumulated = import_balancete(&envelope, ConsolidationConfig::default(), Some("Simples Nacional"))
        .expect("trial balance should consolidate");
    let quarter = import_balancete(
        &envelope,
        ConsolidationConfig::with_value_fields(&["bdmovimento"][..]),
        None,
    )
    .expect("trial balance should consolidate");

    println!(
        "{} ({}) - regime {:?}",
        accumulated.company.razao_social, accumulated.company.cnpj, accumulated.regime
    );
    println!("{:<24} {:>16} {:>16}", "field", "accumulated", "movement");
    for field in AggregateField::ALL {
        println!(
            "{:<24} {:>16} {:>16}",
            field.key(),
            format_brl(accumulated.aggregate.get(field).unwrap_or(0.0)),
            format_brl(quarter.aggregate.get(field).unwrap_or(0.0)),
        );
    }
}
