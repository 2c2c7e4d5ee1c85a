use serde::{Deserialize, Serialize};
use std::fmt;

/// Target database system the user picked in the dropdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    BigQuery,
    Snowflake,
    Redshift,
    Azure,
    MySql,
    Postgres,
    MongoDb,
    DynamoDb,
}

/// Groups of dialects that share the same optimization focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectFamily {
    Warehouse,
    Relational,
    Document,
    KeyValue,
}

/// Static registry entry for one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectDescriptor {
    pub dialect: Dialect,
    pub identifier: &'static str,
    pub display_label: &'static str,
    pub family: DialectFamily,
    /// Language used to highlight the editor contents.
    pub editor_language: &'static str,
    pub example: &'static str,
}

/// The selection as it arrives from the UI control, which can hold any string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialectSelection {
    Known(Dialect),
    Unrecognized(String),
}

impl DialectSelection {
    pub fn from_id(id: &str) -> Self {
        match Dialect::parse(id) {
            Some(dialect) => Self::Known(dialect),
            None => Self::Unrecognized(id.trim().to_string()),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Known(dialect) => dialect.id(),
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn descriptor(&self) -> Option<&'static DialectDescriptor> {
        match self {
            Self::Known(dialect) => Some(dialect.descriptor()),
            Self::Unrecognized(_) => None,
        }
    }

    /// Example text for the editor; empty when the registry has none.
    pub fn example(&self) -> &'static str {
        self.descriptor().map(|d| d.example).unwrap_or("")
    }

    pub fn editor_language(&self) -> &'static str {
        self.descriptor().map(|d| d.editor_language).unwrap_or("sql")
    }
}

impl Default for DialectSelection {
    fn default() -> Self {
        Self::Known(Dialect::default())
    }
}

impl Dialect {
    pub const ALL: [Dialect; 8] = [
        Dialect::BigQuery,
        Dialect::Snowflake,
        Dialect::Redshift,
        Dialect::Azure,
        Dialect::MySql,
        Dialect::Postgres,
        Dialect::MongoDb,
        Dialect::DynamoDb,
    ];

    /// Exact identifier match, ignoring case and surrounding whitespace.
    pub fn parse(id: &str) -> Option<Self> {
        let id = id.trim();
        REGISTRY
            .iter()
            .find(|d| d.identifier.eq_ignore_ascii_case(id))
            .map(|d| d.dialect)
    }

    pub fn descriptor(self) -> &'static DialectDescriptor {
        // REGISTRY is declared in the same order as the enum variants.
        &REGISTRY[self as usize]
    }

    pub fn id(self) -> &'static str {
        self.descriptor().identifier
    }

    pub fn label(self) -> &'static str {
        self.descriptor().display_label
    }

    pub fn family(self) -> DialectFamily {
        self.descriptor().family
    }

    pub fn example(self) -> &'static str {
        self.descriptor().example
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Every dialect in dropdown order.
pub fn registry() -> &'static [DialectDescriptor] {
    &REGISTRY
}

static REGISTRY: [DialectDescriptor; 8] = [
    DialectDescriptor {
        dialect: Dialect::BigQuery,
        identifier: "bigquery",
        display_label: "Google BigQuery",
        family: DialectFamily::Warehouse,
        editor_language: "sql",
        example: BIGQUERY_EXAMPLE,
    },
    DialectDescriptor {
        dialect: Dialect::Snowflake,
        identifier: "snowflake",
        display_label: "Snowflake",
        family: DialectFamily::Warehouse,
        editor_language: "sql",
        example: SNOWFLAKE_EXAMPLE,
    },
    DialectDescriptor {
        dialect: Dialect::Redshift,
        identifier: "redshift",
        display_label: "Amazon Redshift",
        family: DialectFamily::Warehouse,
        editor_language: "sql",
        example: REDSHIFT_EXAMPLE,
    },
    DialectDescriptor {
        dialect: Dialect::Azure,
        identifier: "azure",
        display_label: "Azure Synapse",
        family: DialectFamily::Warehouse,
        editor_language: "sql",
        example: AZURE_EXAMPLE,
    },
    DialectDescriptor {
        dialect: Dialect::MySql,
        identifier: "mysql",
        display_label: "MySQL",
        family: DialectFamily::Relational,
        editor_language: "sql",
        example: MYSQL_EXAMPLE,
    },
    DialectDescriptor {
        dialect: Dialect::Postgres,
        identifier: "postgres",
        display_label: "PostgreSQL",
        family: DialectFamily::Relational,
        editor_language: "sql",
        example: POSTGRES_EXAMPLE,
    },
    DialectDescriptor {
        dialect: Dialect::MongoDb,
        identifier: "mongodb",
        display_label: "MongoDB",
        family: DialectFamily::Document,
        editor_language: "javascript",
        example: MONGODB_EXAMPLE,
    },
    DialectDescriptor {
        dialect: Dialect::DynamoDb,
        identifier: "dynamodb",
        display_label: "DynamoDB (Scan/Query)",
        family: DialectFamily::KeyValue,
        editor_language: "json",
        example: DYNAMODB_EXAMPLE,
    },
];

const BIGQUERY_EXAMPLE: &str = r#"-- This query joins a large fact table with a dimension table.
-- It might be inefficient if tables are not partitioned and clustered correctly.
SELECT
  u.country,
  COUNT(e.event_id) AS total_events
FROM
  `my-project.my_dataset.events` AS e
JOIN
  `my-project.my_dataset.users` AS u ON e.user_id = u.user_id
WHERE
  e.event_date BETWEEN '2024-01-01' AND '2024-01-31'
GROUP BY
  u.country
ORDER BY
  total_events DESC;"#;

const SNOWFLAKE_EXAMPLE: &str = r#"-- This query filters a large table with a WHERE clause on a VARIANT column.
-- This can be slow as it may require a full table scan without proper clustering.
SELECT
  raw_event:event_name::STRING AS event_name,
  COUNT(*) as event_count
FROM
  events_raw_data
WHERE
  raw_event:user_properties.country::STRING = 'USA'
  AND event_timestamp >= '2024-01-01'
GROUP BY 1
ORDER BY 2 DESC;"#;

const REDSHIFT_EXAMPLE: &str = r#"-- This query joins two large tables.
-- If the distribution keys are not aligned with the join keys,
-- it will cause significant data shuffling across the cluster.
SELECT
  c.customer_name,
  SUM(o.order_total) as total_spent
FROM
  public.orders o
JOIN
  public.customers c ON o.customer_id = c.id
WHERE
  o.order_date >= '2024-01-01'
GROUP BY
  c.customer_name
ORDER BY
  total_spent DESC;"#;

const AZURE_EXAMPLE: &str = r#"-- This query uses a REPLICATE distribution for a large fact table,
-- which might not be optimal for joins with other large tables.
-- A HASH distribution on the join key could be more efficient.
SELECT
    p.ProductName,
    SUM(s.SalesAmount) AS TotalSales
FROM
    FactInternetSales s
JOIN
    DimProduct p ON s.ProductKey = p.ProductKey
GROUP BY
    p.ProductName
ORDER BY
    TotalSales DESC;
"#;

const MYSQL_EXAMPLE: &str = r#"-- This query suffers from an N+1 problem.
-- It fetches posts and then loops to fetch comments for each post individually.
-- A JOIN or a single IN clause query for comments would be better.
SELECT * FROM posts WHERE author_id = 123;
-- In application code:
-- for post in posts:
--   SELECT * FROM comments WHERE post_id = post.id;"#;

const POSTGRES_EXAMPLE: &str = r#"-- This query performs a text search using LIKE with a leading wildcard,
-- which prevents the use of a standard B-tree index.
-- A trigram index (pg_trgm) would be much more performant.
SELECT
  user_id,
  comment_text
FROM
  user_comments
WHERE
  comment_text LIKE '%optimizing performance%';"#;

const MONGODB_EXAMPLE: &str = r#"// This aggregation pipeline may be inefficient without the proper index.
// An index on { "address.country": 1, "registrationDate": 1 } could improve performance.
db.users.aggregate([
  {
    '$match': {
      'address.country': 'Brazil',
      'registrationDate': {
        '$gte': ISODate('2023-01-01T00:00:00.000Z')
      }
    }
  },
  {
    '$group': {
      '_id': '$accountType',
      'count': { '$sum': 1 }
    }
  },
  {
    '$sort': { 'count': -1 }
  }
])"#;

const DYNAMODB_EXAMPLE: &str = r#"{
  "TableName": "ProductCatalog",
  "FilterExpression": "Price > :price_val",
  "ExpressionAttributeValues": {
    ":price_val": {"N": "100"}
  }
}
// This is a Scan operation, which is inefficient and costly for large tables.
// A Query operation on a Global Secondary Index (GSI) on the Price attribute would be better.
"#;
