mod command;
mod query;

use proc_macro::TokenStream;

// ============================================================================
// #[derive(Command)]
// ============================================================================

/// Derive macro that implements `routed_rust::Command`.
///
/// # Usage
///
/// Synchronous command with an explicit routing name:
/// ```ignore
/// #[derive(Serialize, Deserialize, Command)]
/// #[command(name = "order.create")]
/// pub struct CreateOrder {
///     pub id: String,
/// }
/// ```
///
/// Inherently asynchronous command (always handed to the queue runtime):
/// ```ignore
/// #[derive(Serialize, Deserialize, Command)]
/// #[command(name = "email.receipt", queue = "mail", delay_seconds = 30)]
/// pub struct SendReceipt {
///     pub order_id: String,
/// }
///
/// // Async on the runtime's default queue, no delay.
/// #[derive(Serialize, Deserialize, Command)]
/// #[command(deferred)]
/// pub struct RebuildIndex;
/// ```
///
/// The macro supports:
/// - `name = "..."`: routing name (default: `module_path!()::TypeName`)
/// - `queue = "..."`, `delay_seconds = N`, `deferred`: any of these marks the
///   type as async and fills its `AsyncCommand`
#[proc_macro_derive(Command, attributes(command))]
pub fn derive_command(input: TokenStream) -> TokenStream {
    command::derive_command(input)
}

// ============================================================================
// #[derive(Query)]
// ============================================================================

/// Derive macro that implements `routed_rust::Query`.
///
/// ```ignore
/// #[derive(Serialize, Query)]
/// #[query(name = "order.get")]
/// pub struct GetOrder {
///     pub id: String,
/// }
/// ```
#[proc_macro_derive(Query, attributes(query))]
pub fn derive_query(input: TokenStream) -> TokenStream {
    query::derive_query(input)
}
