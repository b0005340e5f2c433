//! Report rendering - formats a calculation for reading or printing.
//!
//! This module is a pure formatter over [`CostReport`]: it never recomputes a
//! figure. Numbers follow a single display convention (`.` groups thousands,
//! `,` separates up to three decimals) and anything non-finite shows as a dash.

use crate::{core::costing::CostReport, models::AdditionalCost};

/// Shown in place of a value that cannot be displayed.
pub const PLACEHOLDER: &str = "—";

const LABEL_WIDTH: usize = 28;
const VALUE_WIDTH: usize = 16;

/// Everything a rendered report needs besides the computed figures.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    /// Selected product, if any
    pub product_name: Option<&'a str>,
    /// Computed figures
    pub report: &'a CostReport,
    /// The additional costs the report was computed with
    pub additional_costs: &'a [AdditionalCost],
}

impl ReportContext<'_> {
    /// A product is selected and the batch size is positive.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.product_name.is_some() && self.report.batch_quantity > 0.0
    }
}

/// Formats an amount with grouped thousands and up to three decimals.
///
/// # Examples
/// `1234567.5` → `"1.234.567,5"`, `-900.0` → `"-900"`
#[must_use]
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return PLACEHOLDER.to_string();
    }

    let formatted = format!("{:.3}", value.abs());
    let (int_part, frac_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    // Values that round to zero lose their sign
    let sign = if value < 0.0 && (int_part != "0" || !frac_part.is_empty()) {
        "-"
    } else {
        ""
    };

    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped},{frac_part}")
    }
}

/// Formats a percentage, e.g. `"20%"`.
#[must_use]
pub fn format_percent(value: f64) -> String {
    format!("{}%", format_amount(value))
}

fn key_value(label: &str, value: &str) -> String {
    format!("  {label:<LABEL_WIDTH$}{value:>VALUE_WIDTH$}")
}

/// Renders the full plain-text report.
#[must_use]
pub fn render_report(ctx: &ReportContext<'_>) -> String {
    let report = ctx.report;
    let mut lines = vec![
        "Production Report".to_string(),
        format!(
            "Product: {} • Qty: {}",
            ctx.product_name.unwrap_or(PLACEHOLDER),
            format_amount(report.batch_quantity)
        ),
        String::new(),
        "Summary".to_string(),
        key_value(
            "Production cost/unit",
            &format_amount(report.production_cost_per_unit),
        ),
        key_value(
            "Selling price/unit",
            &format_amount(report.selling_price_per_unit),
        ),
        key_value("Profit/unit", &format_amount(report.profit_per_unit)),
        key_value("Margin", &format_percent(report.margin_percent)),
        key_value(
            "Total additional costs",
            &format_amount(report.total_additional_cost),
        ),
        key_value(
            "Total material cost",
            &format_amount(report.total_material_cost),
        ),
        key_value("Initial capital", &format_amount(report.initial_capital)),
        key_value("Total profit", &format_amount(report.total_profit)),
        String::new(),
        "Additional costs".to_string(),
    ];

    if ctx.additional_costs.is_empty() {
        lines.push("  No additional costs".to_string());
    } else {
        lines.push(key_value("Name", "Amount"));
        lines.extend(
            ctx.additional_costs
                .iter()
                .map(|c| key_value(&c.name, &format_amount(c.effective_amount()))),
        );
    }

    lines.push(String::new());
    lines.push("Ingredients to buy".to_string());
    if report.purchase_list.is_empty() {
        lines.push("  No recipe for the selected product".to_string());
    } else {
        lines.push(format!(
            "  {:<20}{:>14}{:>14}  {:<6}{:>14}{:>16}",
            "Ingredient", "Qty/product", "Qty total", "Unit", "Price/unit", "Subtotal"
        ));
        for line in &report.purchase_list {
            lines.push(format!(
                "  {:<20}{:>14}{:>14}  {:<6}{:>14}{:>16}",
                line.name,
                format_amount(line.qty_per_product),
                format_amount(line.qty_total),
                line.unit.as_str(),
                format_amount(line.price_per_unit),
                format_amount(line.subtotal)
            ));
        }
    }

    if !ctx.is_complete() {
        lines.push(String::new());
        lines.push(
            "Pick a product with a recipe and a batch quantity (additional costs optional) to see results."
                .to_string(),
        );
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::costing::{MarginPolicy, calculate};
    use crate::core::recipe::resolve_recipe;
    use crate::test_utils::*;

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(900.0), "900");
        assert_eq!(format_amount(5400.0), "5.400");
        assert_eq!(format_amount(45_000.0), "45.000");
        assert_eq!(format_amount(1_234_567.5), "1.234.567,5");
        assert_eq!(format_amount(3333.333_333), "3.333,333");
    }

    #[test]
    fn test_format_amount_negative_and_special_values() {
        assert_eq!(format_amount(-50.0), "-50");
        assert_eq!(format_amount(-1500.25), "-1.500,25");
        assert_eq!(format_amount(-0.0001), "0");
        assert_eq!(format_amount(f64::NAN), PLACEHOLDER);
        assert_eq!(format_amount(f64::INFINITY), PLACEHOLDER);
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(20.0), "20%");
        assert_eq!(format_percent(-12.5), "-12,5%");
    }

    #[test]
    fn test_render_full_report() {
        let rows = vec![priced_row(1000.0, 2.0), priced_row(500.0, 4.0)];
        let costs = vec![AdditionalCost::new("Gas", Some(5000.0))];
        let margin = MarginPolicy {
            default_percent: 20.0,
            override_percent: None,
        };
        let report = calculate(&rows, Some(10.0), margin, &costs);
        let ctx = ReportContext {
            product_name: Some("Bread"),
            report: &report,
            additional_costs: &costs,
        };
        assert!(ctx.is_complete());

        let text = render_report(&ctx);
        assert!(text.starts_with("Production Report\nProduct: Bread • Qty: 10\n"));
        assert!(text.contains(&key_value("Production cost/unit", "4.500")));
        assert!(text.contains(&key_value("Selling price/unit", "5.400")));
        assert!(text.contains(&key_value("Margin", "20%")));
        assert!(text.contains(&key_value("Initial capital", "45.000")));
        assert!(text.contains(&key_value("Total profit", "9.000")));
        assert!(text.contains(&key_value("Gas", "5.000")));
        assert!(text.contains("20.000"));
        assert!(!text.contains("Pick a product"));
    }

    #[test]
    fn test_render_empty_states() {
        let fixture = bakery_fixture();
        let rows = resolve_recipe(&fixture.store, "prd_unknown");
        let report = calculate(&rows, None, MarginPolicy::default(), &[]);
        let ctx = ReportContext {
            product_name: None,
            report: &report,
            additional_costs: &[],
        };
        assert!(!ctx.is_complete());

        let text = render_report(&ctx);
        assert!(text.contains("Product: — • Qty: 0"));
        assert!(text.contains("No additional costs"));
        assert!(text.contains("No recipe for the selected product"));
        assert!(text.contains("Pick a product"));
    }
}
