use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use crate::models::airline::Airline;
use crate::repositories::AirlineRepository;
use crate::utils::error::AppResult;

pub struct MySqlAirlineRepository {
    pool: MySqlPool,
}

impl MySqlAirlineRepository {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlAirlineRepository { pool }
    }
}

#[async_trait]
impl AirlineRepository for MySqlAirlineRepository {
    async fn find(&self, iata_code: &str) -> AppResult<Option<Airline>> {
        let airline = sqlx::query_as::<_, Airline>(
            "SELECT iata_code, icao_code, business_name, common_name FROM airline WHERE iata_code = ?",
        )
        .bind(iata_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(airline)
    }

    async fn find_many(&self, iata_codes: &[String]) -> AppResult<Vec<Airline>> {
        if iata_codes.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<MySql> = QueryBuilder::new(
            "SELECT iata_code, icao_code, business_name, common_name FROM airline WHERE iata_code IN (",
        );
        let mut codes = query.separated(", ");
        for code in iata_codes {
            codes.push_bind(code);
        }
        codes.push_unseparated(")");

        let airlines = query.build_query_as::<Airline>().fetch_all(&self.pool).await?;
        Ok(airlines)
    }

    async fn insert(&self, airline: &Airline) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT IGNORE INTO airline (iata_code, icao_code, business_name, common_name) VALUES (?, ?, ?, ?)",
        )
        .bind(&airline.iata_code)
        .bind(&airline.icao_code)
        .bind(&airline.business_name)
        .bind(&airline.common_name)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_many(&self, airlines: &[Airline]) -> AppResult<u64> {
        if airlines.is_empty() {
            return Ok(0);
        }

        let mut query: QueryBuilder<MySql> =
            QueryBuilder::new("INSERT IGNORE INTO airline (iata_code, icao_code, business_name, common_name) ");
        query.push_values(airlines, |mut row, airline| {
            row.push_bind(&airline.iata_code)
                .push_bind(&airline.icao_code)
                .push_bind(&airline.business_name)
                .push_bind(&airline.common_name);
        });

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
