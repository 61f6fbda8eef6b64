use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    cart::CartLineItem,
    dto::{
        auth::{CreateOperatorRequest, LoginRequest, LoginResponse},
        cart::{AddToCartRequest, CartView},
        catalog::{CatalogView, CategorySection},
        orders::{CounterCheckoutRequest, GuestCheckoutRequest, OrderList},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
    },
    models::{Category, Order, OrderItem, OrderType, Product, ProductRef, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, catalog, health, params},
    services::{
        analytics_service::{Dashboard, ProductPopularity, SalesSummary, TimeFilter},
        checkout_service::{GuestReceipt, HandOff},
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        catalog::catalog,
        catalog::category_products,
        cart::open_cart,
        cart::view_cart,
        cart::clear_cart,
        cart::add_item,
        cart::decrease_item,
        cart::remove_item,
        cart::guest_checkout,
        cart::counter_checkout,
        admin::list_products,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::list_orders,
        admin::get_order,
        admin::dashboard,
        admin::create_operator
    ),
    components(
        schemas(
            User,
            Category,
            ProductRef,
            Product,
            Order,
            OrderItem,
            OrderType,
            CartLineItem,
            CartView,
            AddToCartRequest,
            GuestCheckoutRequest,
            CounterCheckoutRequest,
            GuestReceipt,
            HandOff,
            CatalogView,
            CategorySection,
            ProductList,
            CreateProductRequest,
            UpdateProductRequest,
            OrderList,
            Dashboard,
            SalesSummary,
            ProductPopularity,
            TimeFilter,
            LoginRequest,
            LoginResponse,
            CreateOperatorRequest,
            params::Pagination,
            params::OrderListQuery,
            params::DashboardQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<GuestReceipt>,
            ApiResponse<Dashboard>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Catalog", description = "Storefront catalog"),
        (name = "Cart", description = "Session carts"),
        (name = "Checkout", description = "Guest and point-of-sale order placement"),
        (name = "Admin", description = "Back-office endpoints"),
        (name = "Auth", description = "Operator authentication"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
