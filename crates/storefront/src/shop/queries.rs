//! GraphQL operation definitions for the Shop API.
//!
//! Each operation is a unit struct implementing [`GraphQLQuery`], with a
//! module of the same (snake case) name holding its `Variables` and
//! `ResponseData`. Mutation fields select the success type plus the
//! `ErrorResult` interface so responses decode into [`MutationResult`].

use graphql_client::{GraphQLQuery, QueryBody};

macro_rules! order_fields {
    () => {
        r"
fragment OrderFields on Order {
  id
  code
  state
  active
  currencyCode
  totalQuantity
  subTotal
  subTotalWithTax
  shipping
  shippingWithTax
  total
  totalWithTax
  lines {
    id
    quantity
    unitPriceWithTax
    linePriceWithTax
    productVariant { id name }
    featuredAsset { preview }
  }
  shippingLines {
    priceWithTax
    shippingMethod { id name }
  }
  payments { id state method amount transactionId }
  customer { id emailAddress }
  shippingAddress { fullName streetLine1 city postalCode countryCode }
}
"
    };
}

macro_rules! product_fields {
    () => {
        r"
fragment ProductFields on Product {
  id
  name
  slug
  description
  featuredAsset { preview }
  variants {
    id
    name
    sku
    priceWithTax
    currencyCode
    stockLevel
  }
}
"
    };
}

/// Selection shared by every order mutation result.
macro_rules! order_result {
    () => {
        r"
    __typename
    ... on Order { ...OrderFields }
    ... on ErrorResult { errorCode message }
"
    };
}

/// Declares an operation struct and its `GraphQLQuery` impl.
macro_rules! operation {
    ($name:ident, $module:ident, $operation_name:literal, $query:expr) => {
        pub struct $name;

        impl GraphQLQuery for $name {
            type Variables = $module::Variables;
            type ResponseData = $module::ResponseData;

            fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
                QueryBody {
                    variables,
                    query: $query,
                    operation_name: $operation_name,
                }
            }
        }
    };
}

// =============================================================================
// Orders
// =============================================================================

operation!(
    ActiveOrder,
    active_order,
    "ActiveOrder",
    concat!(
        "query ActiveOrder { activeOrder { ...OrderFields } }",
        order_fields!()
    )
);

pub mod active_order {
    use serde::{Deserialize, Serialize};

    use crate::shop::types::Order;

    #[derive(Debug, Serialize)]
    pub struct Variables;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub active_order: Option<Order>,
    }
}

operation!(
    OrderByCode,
    order_by_code,
    "OrderByCode",
    concat!(
        "query OrderByCode($code: String!) { orderByCode(code: $code) { ...OrderFields } }",
        order_fields!()
    )
);

pub mod order_by_code {
    use serde::{Deserialize, Serialize};

    use crate::shop::types::Order;

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub code: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub order_by_code: Option<Order>,
    }
}

operation!(
    AddItemToOrder,
    add_item_to_order,
    "AddItemToOrder",
    concat!(
        "mutation AddItemToOrder($productVariantId: ID!, $quantity: Int!) {\n",
        "  addItemToOrder(productVariantId: $productVariantId, quantity: $quantity) {",
        order_result!(),
        "  }\n}\n",
        order_fields!()
    )
);

pub mod add_item_to_order {
    use serde::{Deserialize, Serialize};

    use crate::shop::types::{MutationResult, Order};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub product_variant_id: String,
        pub quantity: i64,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub add_item_to_order: MutationResult<Order>,
    }
}

operation!(
    SetCustomerForOrder,
    set_customer_for_order,
    "SetCustomerForOrder",
    concat!(
        "mutation SetCustomerForOrder($input: CreateCustomerInput!) {\n",
        "  setCustomerForOrder(input: $input) {",
        order_result!(),
        "  }\n}\n",
        order_fields!()
    )
);

pub mod set_customer_for_order {
    use serde::{Deserialize, Serialize};

    use crate::shop::types::{CustomerInput, MutationResult, Order};

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub input: CustomerInput,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub set_customer_for_order: MutationResult<Order>,
    }
}

operation!(
    SetOrderShippingAddress,
    set_order_shipping_address,
    "SetOrderShippingAddress",
    concat!(
        "mutation SetOrderShippingAddress($input: CreateAddressInput!) {\n",
        "  setOrderShippingAddress(input: $input) {",
        order_result!(),
        "  }\n}\n",
        order_fields!()
    )
);

pub mod set_order_shipping_address {
    use serde::{Deserialize, Serialize};

    use crate::shop::types::{AddressInput, MutationResult, Order};

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub input: AddressInput,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub set_order_shipping_address: MutationResult<Order>,
    }
}

operation!(
    EligibleShippingMethods,
    eligible_shipping_methods,
    "EligibleShippingMethods",
    r"query EligibleShippingMethods {
  eligibleShippingMethods { id code name description price priceWithTax }
}
"
);

pub mod eligible_shipping_methods {
    use serde::{Deserialize, Serialize};

    use crate::shop::types::ShippingQuote;

    #[derive(Debug, Serialize)]
    pub struct Variables;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub eligible_shipping_methods: Vec<ShippingQuote>,
    }
}

operation!(
    SetOrderShippingMethod,
    set_order_shipping_method,
    "SetOrderShippingMethod",
    concat!(
        "mutation SetOrderShippingMethod($shippingMethodId: [ID!]!) {\n",
        "  setOrderShippingMethod(shippingMethodId: $shippingMethodId) {",
        order_result!(),
        "  }\n}\n",
        order_fields!()
    )
);

pub mod set_order_shipping_method {
    use serde::{Deserialize, Serialize};

    use crate::shop::types::{MutationResult, Order};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub shipping_method_id: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub set_order_shipping_method: MutationResult<Order>,
    }
}

operation!(
    TransitionOrderToState,
    transition_order_to_state,
    "TransitionOrderToState",
    concat!(
        "mutation TransitionOrderToState($state: String!) {\n",
        "  transitionOrderToState(state: $state) {",
        order_result!(),
        "  }\n}\n",
        order_fields!()
    )
);

pub mod transition_order_to_state {
    use serde::{Deserialize, Serialize};

    use crate::shop::types::{MutationResult, Order};

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub state: String,
    }

    /// `transitionOrderToState` is null when the session has no active order.
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub transition_order_to_state: Option<MutationResult<Order>>,
    }
}

operation!(
    AddPaymentToOrder,
    add_payment_to_order,
    "AddPaymentToOrder",
    concat!(
        "mutation AddPaymentToOrder($input: PaymentInput!) {\n",
        "  addPaymentToOrder(input: $input) {",
        order_result!(),
        "  }\n}\n",
        order_fields!()
    )
);

pub mod add_payment_to_order {
    use serde::{Deserialize, Serialize};

    use crate::shop::types::{MutationResult, Order, PaymentInput};

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub input: PaymentInput,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub add_payment_to_order: MutationResult<Order>,
    }
}

// =============================================================================
// Catalogue
// =============================================================================

operation!(
    GetProducts,
    get_products,
    "GetProducts",
    concat!(
        r"query GetProducts($options: ProductListOptions) {
  products(options: $options) { items { ...ProductFields } totalItems }
}
",
        product_fields!()
    )
);

pub mod get_products {
    use serde::{Deserialize, Serialize};

    use crate::shop::types::ProductList;

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub options: ProductListOptions,
    }

    #[derive(Debug, Serialize)]
    pub struct ProductListOptions {
        pub take: i64,
        pub skip: i64,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub products: ProductList,
    }
}

operation!(
    GetProductBySlug,
    get_product_by_slug,
    "GetProductBySlug",
    concat!(
        "query GetProductBySlug($slug: String!) { product(slug: $slug) { ...ProductFields } }",
        product_fields!()
    )
);

pub mod get_product_by_slug {
    use serde::{Deserialize, Serialize};

    use crate::shop::types::Product;

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub slug: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub product: Option<Product>,
    }
}

// =============================================================================
// Customers
// =============================================================================

operation!(
    Login,
    login,
    "Login",
    r"mutation Login($username: String!, $password: String!, $rememberMe: Boolean) {
  login(username: $username, password: $password, rememberMe: $rememberMe) {
    __typename
    ... on CurrentUser { id identifier }
    ... on ErrorResult { errorCode message }
  }
}
"
);

pub mod login {
    use serde::{Deserialize, Serialize};

    use crate::shop::types::{CurrentUser, MutationResult};

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub username: String,
        pub password: String,
        pub remember_me: bool,
    }

    impl std::fmt::Debug for Variables {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Variables")
                .field("username", &self.username)
                .field("password", &"[REDACTED]")
                .field("remember_me", &self.remember_me)
                .finish()
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub login: MutationResult<CurrentUser>,
    }
}

operation!(
    Logout,
    logout,
    "Logout",
    "mutation Logout { logout { success } }"
);

pub mod logout {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    pub struct Variables;

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub logout: Success,
    }

    #[derive(Debug, Deserialize)]
    pub struct Success {
        pub success: bool,
    }
}

operation!(
    ActiveCustomer,
    active_customer,
    "ActiveCustomer",
    "query ActiveCustomer { activeCustomer { id firstName lastName emailAddress } }"
);

pub mod active_customer {
    use serde::{Deserialize, Serialize};

    use crate::shop::types::Customer;

    #[derive(Debug, Serialize)]
    pub struct Variables;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub active_customer: Option<Customer>,
    }
}
