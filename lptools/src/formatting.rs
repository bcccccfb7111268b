use std::fmt::Write;

use anyhow::Result;
use laundry_payment_engine::{db_types::Order, order_objects::OrderResult};
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn markdown_style(table: &mut Table) {
    table.set_format(markdown_format());
}

pub fn format_order_result(orders: &OrderResult) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "===============================================================================")?;
    writeln!(
        f,
        "Orders for {customer}\n{count:>4} orders. Total value: {value}",
        customer = orders.customer_id,
        count = orders.total_orders,
        value = orders.total_amount
    )?;
    writeln!(f, "===============================================================================")?;
    writeln!(f, "{}", format_orders(&orders.orders))?;
    Ok(f)
}

pub fn format_orders(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "No orders".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row![
        "ID",
        "Order id",
        "Customer id",
        "Items",
        "Amount",
        "Status",
        "Reference",
        "Pickup",
        "Dropoff",
        "Updated At"
    ]);
    orders.iter().for_each(|order| {
        table.add_row(row![
            order.id,
            order.order_id.as_str(),
            order.customer_id,
            item_summary(order),
            format!("{:>11}", order.total_amount),
            order.status.to_string(),
            order.payment_reference.as_deref().unwrap_or_default(),
            order.pickup_date.format("%Y-%m-%d %H:%M"),
            order.dropoff_date.format("%Y-%m-%d %H:%M"),
            order.updated_at.format("%Y-%m-%d %H:%M")
        ]);
    });
    markdown_style(&mut table);
    format!("{table}\n")
}

fn item_summary(order: &Order) -> String {
    order.items.iter().map(|item| format!("{}x {}", item.quantity, item.kind)).collect::<Vec<String>>().join(", ")
}
