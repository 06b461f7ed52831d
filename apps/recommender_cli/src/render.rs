use std::fmt::Write as _;

use client_core::{EntityStore, RecommendationsState};
use shared::{
    domain::ActiveView,
    protocol::{Product, Recommendation},
};

pub fn render(store: &EntityStore) -> String {
    let mut out = String::new();
    match store.selected_user() {
        Some(user) => {
            let _ = writeln!(out, "User: {} ({})", user.username, user.email);
        }
        None => out.push_str("User: none selected\n"),
    }
    out.push('\n');

    match store.active_view() {
        ActiveView::Recommendations => render_recommendations(store, &mut out),
        ActiveView::Products => render_products(store.products(), &mut out),
    }
    out
}

fn render_recommendations(store: &EntityStore, out: &mut String) {
    out.push_str("Personalized Recommendations\n");
    match store.recommendations_state() {
        RecommendationsState::Idle => out.push_str("  (not loaded)\n"),
        RecommendationsState::Loading => out.push_str("  Loading recommendations...\n"),
        RecommendationsState::Empty => out.push_str(
            "  No recommendations available. Try interacting with some products first!\n",
        ),
        RecommendationsState::Failed => {
            out.push_str("  Recommendations could not be loaded. Use --refresh to retry.\n")
        }
        RecommendationsState::Loaded => {
            for (rank, rec) in store.recommendations().iter().enumerate() {
                render_recommendation(rank + 1, rec, out);
            }
        }
    }
}

fn render_recommendation(rank: usize, rec: &Recommendation, out: &mut String) {
    let _ = writeln!(
        out,
        "#{rank} {} [match {}%]",
        product_line(&rec.product),
        rec.match_percent()
    );
    let _ = writeln!(out, "    Why: {}", rec.explanation);
}

fn render_products(products: &[Product], out: &mut String) {
    out.push_str("All Products\n");
    if products.is_empty() {
        out.push_str("  (no products)\n");
    }
    for product in products {
        let _ = writeln!(out, "  {}", product_line(product));
    }
}

fn product_line(product: &Product) -> String {
    format!(
        "[{}] {} ({}) {} {:.1} ${:.2}",
        product.id,
        product.name,
        product.category,
        "*".repeat(product.star_count()),
        product.rating,
        product.price
    )
}

#[cfg(test)]
mod tests {
    use shared::domain::ProductId;

    use super::*;

    fn product(id: i64, rating: f64) -> Product {
        Product {
            id: ProductId(id),
            name: "Trail Shoes".into(),
            description: "Light runners".into(),
            category: "Sports".into(),
            price: 89.5,
            image_url: String::new(),
            rating,
            tags: String::new(),
        }
    }

    #[test]
    fn product_line_shows_stars_and_price() {
        assert_eq!(
            product_line(&product(7, 4.4)),
            "[7] Trail Shoes (Sports) **** 4.4 $89.50"
        );
    }

    #[test]
    fn recommendation_shows_rank_and_match() {
        let mut out = String::new();
        render_recommendation(
            2,
            &Recommendation {
                product: product(3, 5.0),
                score: 0.734,
                explanation: "You liked Sports items".into(),
            },
            &mut out,
        );
        assert!(out.starts_with("#2 [3] Trail Shoes"));
        assert!(out.contains("[match 73%]"));
        assert!(out.contains("Why: You liked Sports items"));
    }

    #[test]
    fn empty_store_renders_placeholders() {
        let store = EntityStore::new();
        let text = render(&store);
        assert!(text.contains("User: none selected"));
        assert!(text.contains("(not loaded)"));
    }
}
