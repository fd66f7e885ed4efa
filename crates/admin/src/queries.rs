//! GraphQL operation definitions for the Admin API.

use graphql_client::{GraphQLQuery, QueryBody};

/// Selection for background jobs.
macro_rules! job_fields {
    () => {
        "id queueName state progress result error"
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
// Auth
// =============================================================================

operation!(
    AdminLogin,
    admin_login,
    "AdminLogin",
    r"mutation AdminLogin($username: String!, $password: String!) {
  login(username: $username, password: $password) {
    __typename
    ... on CurrentUser { id identifier }
    ... on ErrorResult { errorCode message }
  }
}"
);

pub mod admin_login {
    use serde::{Deserialize, Serialize};

    use crate::types::LoginResult;

    #[derive(Serialize)]
    pub struct Variables {
        pub username: String,
        pub password: String,
    }

    impl std::fmt::Debug for Variables {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Variables")
                .field("username", &self.username)
                .field("password", &"[REDACTED]")
                .finish()
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub login: LoginResult,
    }
}

// =============================================================================
// Setup
// =============================================================================

operation!(
    ActiveChannel,
    active_channel,
    "ActiveChannel",
    r"query ActiveChannel {
  activeChannel {
    id
    code
    defaultShippingZone { id name }
    defaultTaxZone { id name }
  }
}"
);

pub mod active_channel {
    use serde::{Deserialize, Serialize};

    use crate::types::Channel;

    #[derive(Debug, Serialize)]
    pub struct Variables;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub active_channel: Channel,
    }
}

operation!(
    Zones,
    zones,
    "Zones",
    r"query Zones($take: Int!) {
  zones(options: { take: $take }) {
    items { id name members { code name enabled } }
    totalItems
  }
}"
);

pub mod zones {
    use serde::{Deserialize, Serialize};

    use crate::types::{ItemList, Zone};

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub take: i64,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub zones: ItemList<Zone>,
    }
}

operation!(
    ShippingMethods,
    shipping_methods,
    "ShippingMethods",
    r"query ShippingMethods($take: Int!) {
  shippingMethods(options: { take: $take }) {
    items { id code name checker { code } calculator { code } }
    totalItems
  }
}"
);

pub mod shipping_methods {
    use serde::{Deserialize, Serialize};

    use crate::types::{ItemList, ShippingMethod};

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub take: i64,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub shipping_methods: ItemList<ShippingMethod>,
    }
}

operation!(
    PaymentMethods,
    payment_methods,
    "PaymentMethods",
    r"query PaymentMethods($take: Int!) {
  paymentMethods(options: { take: $take }) {
    items { id code name enabled handler { code } }
    totalItems
  }
}"
);

pub mod payment_methods {
    use serde::{Deserialize, Serialize};

    use crate::types::{ItemList, PaymentMethod};

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub take: i64,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub payment_methods: ItemList<PaymentMethod>,
    }
}

// =============================================================================
// Search index and jobs
// =============================================================================

operation!(
    Reindex,
    reindex,
    "Reindex",
    concat!("mutation Reindex { reindex { ", job_fields!(), " } }")
);

pub mod reindex {
    use serde::{Deserialize, Serialize};

    use crate::types::Job;

    #[derive(Debug, Serialize)]
    pub struct Variables;

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub reindex: Job,
    }
}

operation!(
    GetJob,
    get_job,
    "GetJob",
    concat!(
        "query GetJob($jobId: ID!) { job(jobId: $jobId) { ",
        job_fields!(),
        " } }"
    )
);

pub mod get_job {
    use serde::{Deserialize, Serialize};

    use crate::types::Job;

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub job_id: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub job: Option<Job>,
    }
}
