pub mod profiles;
pub mod shopify_csv;
