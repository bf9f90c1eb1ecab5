/// A product in the catalog
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: Price,
    #[serde(rename = "tagList")]
    pub tags: Vec<String>,
    pub discontinued: Option<bool>,
}

pub struct Price {
    pub amount: f64,
    pub currency: Currency,
}

pub enum Currency {
    Eur,
    Usd,
}
