//! Product and doctor catalog
//!
//! Seeded once from static data. When `admin-products` holds a valid
//! product list it replaces the seeded products.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use crate::domain::{Money, Product, ProductId};
use crate::storage::{self, keys, KeyValueStore, StorageError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub experience_years: u32,
    pub rating: f32,
    pub available: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    products: Vec<Product>,
    doctors: Vec<Doctor>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSort { PriceAsc, PriceDesc, Name, Rating }

/// Browse filters; every field is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Browse {
    pub search: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub in_stock_only: bool,
    pub sort: Option<ProductSort>,
}

impl Browse {
    pub fn matches(&self, p: &Product) -> bool {
        if self.in_stock_only && !p.in_stock { return false; }
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if !p.category.eq_ignore_ascii_case(category) { return false; }
        }
        match self.search.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                let q = q.to_lowercase();
                [&p.name, &p.brand, &p.description].iter().any(|field| field.to_lowercase().contains(&q))
            }
            None => true,
        }
    }
}

impl Catalog {
    pub fn new(products: Vec<Product>, doctors: Vec<Doctor>) -> Self { Self { products, doctors } }

    /// Seeded catalog with the stored admin override applied, if any.
    /// Malformed products in the override are skipped one by one.
    pub async fn load(store: &dyn KeyValueStore) -> Result<Self, StorageError> {
        let mut catalog = Self::seeded();
        match storage::read_json_list::<Product>(store, keys::ADMIN_PRODUCTS).await? {
            Some(products) => {
                tracing::info!(count = products.len(), "using stored product list");
                catalog.products = products;
            }
            None => tracing::info!(count = catalog.products.len(), "using seeded product list"),
        }
        Ok(catalog)
    }

    pub fn products(&self) -> &[Product] { &self.products }
    pub fn doctors(&self) -> &[Doctor] { &self.doctors }
    pub fn find(&self, id: &ProductId) -> Option<&Product> { self.products.iter().find(|p| &p.id == id) }

    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self.products.iter().map(|p| p.category.as_str()).collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }

    pub fn browse(&self, filter: &Browse) -> Vec<&Product> {
        let mut found: Vec<&Product> = self.products.iter().filter(|p| filter.matches(p)).collect();
        if let Some(sort) = filter.sort {
            found.sort_by(|a, b| match sort {
                ProductSort::PriceAsc => a.price.cmp(&b.price),
                ProductSort::PriceDesc => b.price.cmp(&a.price),
                ProductSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
                ProductSort::Rating => b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal),
            });
        }
        found
    }

    pub(crate) fn products_mut(&mut self) -> &mut Vec<Product> { &mut self.products }

    pub fn seeded() -> Self {
        let products = SEED_PRODUCTS.iter()
            .filter_map(|s| s.build())
            .collect();
        let doctors = vec![
            Doctor { id: "d-001".into(), name: "Dr. Sarah Ahmed".into(), specialty: "General Practice".into(), experience_years: 12, rating: 4.8, available: true },
            Doctor { id: "d-002".into(), name: "Dr. Omar Hassan".into(), specialty: "Dermatology".into(), experience_years: 8, rating: 4.6, available: true },
            Doctor { id: "d-003".into(), name: "Dr. Lina Farouk".into(), specialty: "Pediatrics".into(), experience_years: 15, rating: 4.9, available: false },
        ];
        Self { products, doctors }
    }
}

struct Seed {
    id: &'static str,
    name: &'static str,
    brand: &'static str,
    category: &'static str,
    price_minor: i64,
    stock: u32,
    rating: f32,
    reviews: u32,
    description: &'static str,
    form: &'static str,
}

impl Seed {
    fn build(&self) -> Option<Product> {
        let id = ProductId::new(self.id).ok()?;
        Some(Product {
            id, name: self.name.into(), brand: self.brand.into(), category: self.category.into(),
            price: Money::from_minor(self.price_minor), description: self.description.into(),
            in_stock: self.stock > 0, stock_count: self.stock, rating: self.rating, review_count: self.reviews,
            image_ref: format!("/images/products/{}.jpg", self.id),
            attributes: [("form".to_string(), self.form.to_string())].into_iter().collect(),
        })
    }
}

const SEED_PRODUCTS: &[Seed] = &[
    Seed { id: "p-001", name: "Paracetamol 500mg", brand: "Panadol", category: "Pain Relief", price_minor: 1299, stock: 120, rating: 4.7, reviews: 342, description: "Fast relief from headaches, fever and mild pain.", form: "tablet" },
    Seed { id: "p-002", name: "Vitamin C 1000mg", brand: "Nature's Bounty", category: "Vitamins", price_minor: 2499, stock: 75, rating: 4.5, reviews: 198, description: "Immune support with rose hips.", form: "tablet" },
    Seed { id: "p-003", name: "Ibuprofen 200mg", brand: "Advil", category: "Pain Relief", price_minor: 899, stock: 60, rating: 4.6, reviews: 267, description: "Anti-inflammatory pain reliever.", form: "capsule" },
    Seed { id: "p-004", name: "Moisturizing Cream", brand: "CeraVe", category: "Skin Care", price_minor: 1850, stock: 40, rating: 4.8, reviews: 512, description: "Daily moisturizer with ceramides for dry skin.", form: "cream" },
    Seed { id: "p-005", name: "Digital Thermometer", brand: "Braun", category: "Medical Devices", price_minor: 3499, stock: 0, rating: 4.4, reviews: 89, description: "Fast and accurate oral thermometer.", form: "device" },
    Seed { id: "p-006", name: "Omega-3 Fish Oil", brand: "Nordic Naturals", category: "Vitamins", price_minor: 2999, stock: 33, rating: 4.7, reviews: 154, description: "Heart and brain health support.", form: "softgel" },
    Seed { id: "p-007", name: "Cough Syrup", brand: "Robitussin", category: "Cold & Flu", price_minor: 1125, stock: 18, rating: 4.2, reviews: 76, description: "Non-drowsy relief from chest congestion.", form: "syrup" },
    Seed { id: "p-008", name: "Sunscreen SPF 50", brand: "La Roche-Posay", category: "Skin Care", price_minor: 2275, stock: 25, rating: 4.9, reviews: 430, description: "Broad spectrum protection for sensitive skin.", form: "lotion" },
];
