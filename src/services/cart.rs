//! Customer carts

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{is_unique_violation, ApiError, Result};
use crate::models::cart::{AddCartItemRequest, Cart, CartItem, CartItemView, CartView};
use crate::models::product::{ProductSummary, ProductVariant, VariantWithProduct};

fn cart_not_found() -> ApiError {
    ApiError::NotFound("Cart not found".into())
}

fn item_not_found() -> ApiError {
    ApiError::NotFound("Cart item not found".into())
}

async fn customer_id_for(db: &PgPool, user_id: Uuid) -> Result<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM customers WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(row.map(|(id,)| id))
}

async fn find_cart(db: &PgPool, id: Uuid) -> Result<Cart> {
    sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(cart_not_found)
}

/// Loads items for the carts and attaches variant and product summaries.
async fn hydrate(db: &PgPool, carts: Vec<Cart>) -> Result<Vec<CartView>> {
    let cart_ids: Vec<Uuid> = carts.iter().map(|c| c.id).collect();
    let items = sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE cart_id = ANY($1) ORDER BY created_at")
        .bind(&cart_ids)
        .fetch_all(db)
        .await?;

    let variant_ids: Vec<Uuid> = items.iter().map(|i| i.product_variant_id).collect();
    let variants = sqlx::query_as::<_, ProductVariant>("SELECT * FROM product_variants WHERE id = ANY($1)")
        .bind(&variant_ids)
        .fetch_all(db)
        .await?;
    let product_ids: Vec<Uuid> = variants.iter().map(|v| v.product_id).collect();
    let products: HashMap<Uuid, ProductSummary> = sqlx::query_as::<_, ProductSummary>(
        "SELECT id, name, price, images, created_by FROM products WHERE id = ANY($1)",
    )
    .bind(&product_ids)
    .fetch_all(db)
    .await?
    .into_iter()
    .map(|p| (p.id, p))
    .collect();
    let variants: HashMap<Uuid, VariantWithProduct> = variants
        .into_iter()
        .filter_map(|v| {
            let product = products.get(&v.product_id)?.clone();
            Some((v.id, VariantWithProduct { variant: v, product }))
        })
        .collect();

    let mut by_cart: HashMap<Uuid, Vec<CartItemView>> = HashMap::new();
    for item in items {
        let product_variant = variants.get(&item.product_variant_id).cloned();
        by_cart.entry(item.cart_id).or_default().push(CartItemView { item, product_variant });
    }
    Ok(carts
        .into_iter()
        .map(|cart| CartView { cart_items: by_cart.remove(&cart.id).unwrap_or_default(), cart })
        .collect())
}

pub async fn list(db: &PgPool, customer_id: Option<Uuid>) -> Result<Vec<CartView>> {
    let carts = sqlx::query_as::<_, Cart>(
        "SELECT * FROM carts WHERE ($1::uuid IS NULL OR customer_id = $1) ORDER BY created_at DESC",
    )
    .bind(customer_id)
    .fetch_all(db)
    .await?;
    hydrate(db, carts).await
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<CartView> {
    let cart = find_cart(db, id).await?;
    hydrate(db, vec![cart]).await?.pop().ok_or_else(cart_not_found)
}

/// A customer owns at most one cart.
pub async fn create(db: &PgPool, customer_id: Uuid) -> Result<Cart> {
    let (customer,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM customers WHERE id = $1)")
        .bind(customer_id)
        .fetch_one(db)
        .await?;
    if !customer {
        return Err(ApiError::NotFound("Customer not found".into()));
    }
    let already_exists = || ApiError::BadRequest("Cart already exists for this customer".into());
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM carts WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_optional(db)
        .await?;
    if existing.is_some() {
        return Err(already_exists());
    }
    let cart = sqlx::query_as::<_, Cart>("INSERT INTO carts (id, customer_id) VALUES ($1, $2) RETURNING *")
        .bind(Uuid::now_v7())
        .bind(customer_id)
        .fetch_one(db)
        .await
        .map_err(|e| if is_unique_violation(&e) { already_exists() } else { e.into() })?;
    tracing::info!(cart_id = %cart.id, customer_id = %customer_id, "Cart created");
    Ok(cart)
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM carts WHERE id = $1").bind(id).execute(db).await?;
    if result.rows_affected() == 0 {
        return Err(cart_not_found());
    }
    Ok(())
}

/// Adding a variant already in the cart increases its quantity.
pub async fn add_item(db: &PgPool, user: &AuthUser, cart_id: Uuid, req: &AddCartItemRequest) -> Result<CartItem> {
    find_cart(db, cart_id).await?;
    let (variant,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM product_variants WHERE id = $1)")
        .bind(req.product_variant_id)
        .fetch_one(db)
        .await?;
    if !variant {
        return Err(ApiError::NotFound("Product variant not found".into()));
    }
    let customer_id = customer_id_for(db, user.user_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Customer profile not found".into()))?;

    let item = sqlx::query_as::<_, CartItem>(
        "INSERT INTO cart_items (id, cart_id, customer_id, product_variant_id, quantity) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (cart_id, product_variant_id) \
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW() \
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(cart_id)
    .bind(customer_id)
    .bind(req.product_variant_id)
    .bind(req.quantity)
    .fetch_one(db)
    .await?;
    tracing::debug!(cart_id = %cart_id, item_id = %item.id, quantity = item.quantity, "Cart item stored");
    Ok(item)
}

pub async fn get_item(db: &PgPool, cart_id: Uuid, item_id: Uuid) -> Result<CartItem> {
    sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE id = $1 AND cart_id = $2")
        .bind(item_id)
        .bind(cart_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(item_not_found)
}

pub async fn update_item(db: &PgPool, cart_id: Uuid, item_id: Uuid, quantity: i32) -> Result<CartItem> {
    sqlx::query_as::<_, CartItem>(
        "UPDATE cart_items SET quantity = $3, updated_at = NOW() WHERE id = $1 AND cart_id = $2 RETURNING *",
    )
    .bind(item_id)
    .bind(cart_id)
    .bind(quantity)
    .fetch_optional(db)
    .await?
    .ok_or_else(item_not_found)
}

pub async fn delete_item(db: &PgPool, cart_id: Uuid, item_id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
        .bind(item_id)
        .bind(cart_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(item_not_found());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use sqlx::PgPool;
    use uuid::Uuid;

    use crate::domain::Role;
    use crate::testing::{self, account, request, send, Account};

    async fn open_cart(state: &crate::AppState, customer: &Account) -> Uuid {
        let cookie = customer.cookie(state);
        let body = json!({ "customerId": customer.profile_id });
        let (status, body) = send(state, request(Method::POST, "/api/cart", Some(&cookie), Some(body))).await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["cart"]["id"].as_str().unwrap().parse().unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_customer_has_a_single_cart(db: PgPool) {
        let state = testing::state(db);
        let customer = account(&state.db, Role::Customer).await;
        open_cart(&state, &customer).await;

        let cookie = customer.cookie(&state);
        let body = json!({ "customerId": customer.profile_id });
        let (status, body) = send(&state, request(Method::POST, "/api/cart", Some(&cookie), Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Cart already exists for this customer");
        assert_eq!(testing::count(&state.db, "carts").await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_adding_same_variant_accumulates(db: PgPool) {
        let state = testing::state(db);
        let customer = account(&state.db, Role::Customer).await;
        let seller = account(&state.db, Role::Seller).await;
        let category_id = testing::category(&state.db, "Shirts").await;
        let product_id = testing::product(&state.db, &seller, category_id).await;
        let variant_id = testing::variant(&state.db, product_id).await;
        let cart_id = open_cart(&state, &customer).await;

        let cookie = customer.cookie(&state);
        let uri = format!("/api/cart/{cart_id}/items");
        for quantity in [2, 3] {
            let body = json!({ "productVariantId": variant_id, "quantity": quantity });
            let (status, _) = send(&state, request(Method::POST, &uri, Some(&cookie), Some(body))).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (quantity,): (i32,) = sqlx::query_as("SELECT quantity FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(quantity, 5);
        assert_eq!(testing::count(&state.db, "cart_items").await, 1);
    }
}
