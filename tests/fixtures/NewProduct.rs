pub enum NewProduct {
    Draft,
    Listed { name: String, amount: f64 },
}
