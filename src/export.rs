use crate::error::{PlannerError, Result};
use crate::reporting::{CashFlowReport, ProfitAndLossReport};
use crate::schema::{SaleEvent, SalesPlan};
use crate::utils::plan_month_end;
use chrono::NaiveDate;
use log::info;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const SALES_PLAN_FILE: &str = "ventas.csv";
pub const CASH_FLOW_FILE: &str = "cashflow.csv";
pub const PNL_ANNUAL_FILE: &str = "pnl_anual.csv";

const SALES_HEADERS: [&str; 3] = ["ID Venta", "Mes de Inicio", "Categoría Producto"];

fn amount(value: f64) -> String {
    format!("{:.2}", value)
}

pub fn write_sales_plan<W: Write>(writer: W, plan: &SalesPlan) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(SALES_HEADERS)?;
    for sale in plan {
        wtr.serialize(sale)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_sales_plan<R: Read>(reader: R) -> Result<SalesPlan> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut plan = SalesPlan::default();
    for record in rdr.deserialize::<SaleEvent>() {
        plan.push(record?);
    }
    Ok(plan)
}

pub fn read_sales_plan_file(path: &Path) -> Result<SalesPlan> {
    let plan = read_sales_plan(fs::File::open(path)?)?;
    info!("Read {} sales from {}", plan.len(), path.display());
    Ok(plan)
}

/// Monthly cash flow, with a `Fecha` column when the calendar start of the plan is known.
pub fn write_cash_flow<W: Write>(
    writer: W,
    report: &CashFlowReport,
    plan_start: Option<NaiveDate>,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["Mes"];
    if plan_start.is_some() {
        header.push("Fecha");
    }
    header.extend([
        "Total Ingresos",
        "Total Gastos",
        "Flujo Neto Mensual",
        "Flujo Neto Acumulado",
    ]);
    wtr.write_record(&header)?;

    for row in &report.rows {
        let mut record = vec![row.mes.to_string()];
        if let Some(start) = plan_start {
            let month_end =
                plan_month_end(start, row.mes).ok_or_else(|| PlannerError::InvalidParameter {
                    category: "fecha_inicio".to_string(),
                    details: format!("plan month {} from {} is out of calendar range", row.mes, start),
                })?;
            record.push(month_end.format("%Y-%m").to_string());
        }
        record.extend([
            amount(row.total_ingresos),
            amount(row.total_gastos),
            amount(row.flujo_neto_mensual),
            amount(row.flujo_neto_acumulado),
        ]);
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_pnl_annual<W: Write>(writer: W, report: &ProfitAndLossReport) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "Año",
        "Total Ventas",
        "Coste Mantenimiento",
        "Amortizacion",
        "Margen Bruto",
        "EBIT",
    ])?;

    for year in report.annual() {
        wtr.write_record([
            year.anio.to_string(),
            amount(year.total_ventas),
            amount(year.coste_mantenimiento),
            amount(year.amortizacion),
            amount(year.margen_bruto),
            amount(year.ebit),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes the sales plan, the monthly cash flow and the annual P&L into `dir`.
pub fn write_all(
    dir: &Path,
    plan: &SalesPlan,
    cash_flow: &CashFlowReport,
    pnl: &ProfitAndLossReport,
    plan_start: Option<NaiveDate>,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let sales_path = dir.join(SALES_PLAN_FILE);
    write_sales_plan(fs::File::create(&sales_path)?, plan)?;

    let cash_path = dir.join(CASH_FLOW_FILE);
    write_cash_flow(fs::File::create(&cash_path)?, cash_flow, plan_start)?;

    let pnl_path = dir.join(PNL_ANNUAL_FILE);
    write_pnl_annual(fs::File::create(&pnl_path)?, pnl)?;

    info!("Wrote projection outputs to {}", dir.display());
    Ok(vec![sales_path, cash_path, pnl_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FinancialModel;
    use crate::schema::{PaymentStep, ProductCatalog, ProductParameters};

    fn catalog() -> ProductCatalog {
        let mut products = ProductCatalog::new();
        products.insert(
            "Test".to_string(),
            ProductParameters {
                valor_venta: 120.0,
                coste_maquina: 60.0,
                esquema_pagos_venta: vec![PaymentStep::new(0, 1.0)],
                esquema_pago_coste: vec![PaymentStep::new(0, 1.0)],
                mes_inicio_recurrentes: 0,
                duracion_pagos_recurrentes: 0,
                porcentaje_mantenimiento_anual: 0.0,
                meses_amortizacion: 12,
            },
        );
        products
    }

    fn plan() -> SalesPlan {
        vec![
            SaleEvent::new("Venta-001", 1, "Test"),
            SaleEvent::new("Venta-002", 14, "Test"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_sales_plan_csv_round_trip() {
        let mut buffer = Vec::new();
        write_sales_plan(&mut buffer, &plan()).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("ID Venta,Mes de Inicio,Categoría Producto\n"));
        assert!(text.contains("Venta-002,14,Test"));

        let parsed = read_sales_plan(buffer.as_slice()).unwrap();
        assert_eq!(parsed, plan());
    }

    #[test]
    fn test_empty_plan_still_has_header() {
        let mut buffer = Vec::new();
        write_sales_plan(&mut buffer, &SalesPlan::default()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_cash_flow_csv_with_dates() {
        let series = FinancialModel::cash_flow(&catalog(), 3)
            .unwrap()
            .consolidate(&plan())
            .unwrap();
        let report = CashFlowReport::from_series(&series).unwrap();

        let mut buffer = Vec::new();
        write_cash_flow(&mut buffer, &report, NaiveDate::from_ymd_opt(2026, 1, 1)).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Mes,Fecha,Total Ingresos,Total Gastos,Flujo Neto Mensual,Flujo Neto Acumulado"
        );
        assert_eq!(lines[1], "1,2026-01,120.00,-60.00,60.00,60.00");
        assert_eq!(lines[3], "3,2026-03,0.00,0.00,0.00,60.00");
    }

    #[test]
    fn test_pnl_annual_csv() {
        let series = FinancialModel::profit_and_loss(&catalog(), 24)
            .unwrap()
            .consolidate(&plan())
            .unwrap();
        let report = ProfitAndLossReport::from_series(&series).unwrap();

        let mut buffer = Vec::new();
        write_pnl_annual(&mut buffer, &report).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Año,"));
        assert!(lines[1].starts_with("1,120.00,0.00,60.00,120.00,60.00"));
    }

    #[test]
    fn test_write_all_creates_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("output");
        let cash = CashFlowReport::from_series(
            &FinancialModel::cash_flow(&catalog(), 12)
                .unwrap()
                .consolidate(&plan())
                .unwrap(),
        )
        .unwrap();
        let pnl = ProfitAndLossReport::from_series(
            &FinancialModel::profit_and_loss(&catalog(), 12)
                .unwrap()
                .consolidate(&plan())
                .unwrap(),
        )
        .unwrap();

        let files = write_all(&out, &plan(), &cash, &pnl, None).unwrap();
        assert_eq!(files.len(), 3);
        for file in &files {
            assert!(file.exists());
        }
        let reread = read_sales_plan_file(&out.join(SALES_PLAN_FILE)).unwrap();
        assert_eq!(reread.len(), 2);
    }

    #[test]
    fn test_cash_flow_dates_out_of_range_fail() {
        let series = FinancialModel::cash_flow(&catalog(), 3)
            .unwrap()
            .consolidate(&plan())
            .unwrap();
        let report = CashFlowReport::from_series(&series).unwrap();

        let mut buffer = Vec::new();
        let result = write_cash_flow(&mut buffer, &report, Some(NaiveDate::MAX));
        assert!(matches!(result, Err(PlannerError::InvalidParameter { .. })));
    }
}
