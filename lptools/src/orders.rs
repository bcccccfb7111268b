use crate::{client::PaymentServerClient, formatting, OrdersParams};

/// Lists orders. With no filters this is "my orders" for the token's customer id; any filter
/// switches to the admin search, which needs the `read_all` role.
pub async fn list_orders(params: OrdersParams) {
    let profile = match params.server.resolve() {
        Ok(profile) => profile,
        Err(e) => {
            eprintln!("Could not resolve a server profile: {e}");
            std::process::exit(1);
        },
    };
    let client = PaymentServerClient::new(profile);
    if let Some(order_id) = &params.id {
        match client.order_by_id(order_id).await {
            Ok(order) => println!("{}", formatting::format_orders(&[order])),
            Err(e) => eprintln!("Error fetching order {order_id}: {e}"),
        }
        return;
    }
    if params.has_filters() {
        let query = params.to_query();
        match client.search_orders(&query).await {
            Ok(orders) => println!("{}", formatting::format_orders(&orders)),
            Err(e) => eprintln!("Error searching orders: {e}"),
        }
    } else {
        match client.my_orders().await {
            Ok(result) => match formatting::format_order_result(&result) {
                Ok(rendered) => println!("{rendered}"),
                Err(e) => eprintln!("Could not render the orders. {e}"),
            },
            Err(e) => eprintln!("Error fetching orders: {e}"),
        }
    }
}
