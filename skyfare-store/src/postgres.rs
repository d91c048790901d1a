use crate::app_config::DatabaseConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use skyfare_core::{
    Booking, BookingStatus, DemandLevel, Flight, FlightFilter, FlightId, FlightSort, InventoryLedger,
    LedgerError, LedgerResult, LedgerTransaction, Masked, Passenger, PaymentStatus, Pnr, SeatLabel,
    StatusChange,
};
use sqlx::postgres::{PgPoolOptions, Postgres};
use sqlx::{PgConnection, PgPool, Transaction};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

const LOCK_NOT_AVAILABLE: &str = "55P03";
const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";

const FLIGHT_COLUMNS: &str = "id, flight_number, airline, origin, destination, departure_time, \
     arrival_time, base_price, current_price, total_seats, available_seats, demand_level";

const BOOKING_COLUMNS: &str = "id, pnr, flight_id, first_name, last_name, age, email, phone, \
     seat_label, booking_price, status, payment_status, transaction_id, payment_method, \
     created_at, cancelled_at";

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    flight_number: String,
    airline: String,
    origin: String,
    destination: String,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    base_price: Decimal,
    current_price: Decimal,
    total_seats: i32,
    available_seats: i32,
    demand_level: String,
}

impl TryFrom<FlightRow> for Flight {
    type Error = LedgerError;

    fn try_from(row: FlightRow) -> Result<Self, Self::Error> {
        let count = |value: i32, column: &str| {
            u32::try_from(value)
                .map_err(|_| LedgerError::Corrupt(format!("flight {} has {} = {}", row.id, column, value)))
        };
        Ok(Flight {
            id: row.id,
            total_seats: count(row.total_seats, "total_seats")?,
            available_seats: count(row.available_seats, "available_seats")?,
            flight_number: row.flight_number,
            airline: row.airline,
            origin: row.origin,
            destination: row.destination,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            base_price: row.base_price,
            current_price: row.current_price,
            demand_level: DemandLevel::parse_lenient(&row.demand_level),
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    pnr: String,
    flight_id: Uuid,
    first_name: String,
    last_name: String,
    age: i16,
    email: String,
    phone: String,
    seat_label: String,
    booking_price: Decimal,
    status: String,
    payment_status: String,
    transaction_id: String,
    payment_method: String,
    created_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = LedgerError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, value: &str| LedgerError::Corrupt(format!("booking {} has {} {:?}", row.pnr, what, value));

        let age = u8::try_from(row.age).map_err(|_| corrupt("age", &row.age.to_string()))?;
        let seat_label: SeatLabel = row
            .seat_label
            .parse()
            .map_err(|_| corrupt("seat_label", &row.seat_label))?;
        let status = BookingStatus::parse(&row.status).ok_or_else(|| corrupt("status", &row.status))?;
        let payment_status = PaymentStatus::parse(&row.payment_status)
            .ok_or_else(|| corrupt("payment_status", &row.payment_status))?;

        Ok(Booking {
            id: row.id,
            pnr: Pnr::new(&row.pnr),
            flight_id: row.flight_id,
            passenger: Passenger {
                first_name: row.first_name,
                last_name: row.last_name,
                age,
                email: Masked(row.email),
                phone: Masked(row.phone),
            },
            seat_label,
            booking_price: row.booking_price,
            status,
            payment_status,
            transaction_id: row.transaction_id,
            payment_method: row.payment_method,
            created_at: row.created_at,
            cancelled_at: row.cancelled_at,
        })
    }
}

fn db_code(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

fn db_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.constraint().map(str::to_string),
        _ => None,
    }
}

fn backend(err: sqlx::Error) -> LedgerError {
    LedgerError::Backend(err.to_string())
}

/// Ledger on PostgreSQL. Row locks come from `SELECT ... FOR UPDATE`, bounded by
/// `lock_timeout`; uniqueness and seat-count bounds are table constraints.
#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgLedger {
    pub async fn connect(config: &DatabaseConfig, url: &str, lock_timeout: Duration) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(url)
            .await?;

        Ok(Self::from_pool(pool, lock_timeout))
    }

    pub fn from_pool(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

#[async_trait]
impl InventoryLedger for PgLedger {
    async fn begin(&self) -> LedgerResult<Box<dyn LedgerTransaction>> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        // SET does not take bind parameters
        let statement = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis());
        sqlx::query(&statement)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        Ok(Box::new(PgTransaction { tx: Some(tx) }))
    }

    async fn insert_flight(&self, flight: &Flight) -> LedgerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO flights (id, flight_number, airline, origin, destination, departure_time,
                                 arrival_time, base_price, current_price, total_seats, available_seats, demand_level)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(&flight.airline)
        .bind(&flight.origin)
        .bind(&flight.destination)
        .bind(flight.departure_time)
        .bind(flight.arrival_time)
        .bind(flight.base_price)
        .bind(flight.current_price)
        .bind(flight.total_seats as i32)
        .bind(flight.available_seats as i32)
        .bind(flight.demand_level.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| match db_code(&e).as_deref() {
            Some(UNIQUE_VIOLATION) => LedgerError::DuplicateFlight(flight.id),
            Some(CHECK_VIOLATION) => LedgerError::SeatCountOutOfRange(flight.id),
            _ => backend(e),
        })?;
        Ok(())
    }

    async fn get_flight(&self, id: FlightId) -> LedgerResult<Option<Flight>> {
        let sql = format!("SELECT {} FROM flights WHERE id = $1", FLIGHT_COLUMNS);
        let row = sqlx::query_as::<_, FlightRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.map(Flight::try_from).transpose()
    }

    async fn search_flights(&self, filter: &FlightFilter) -> LedgerResult<Vec<Flight>> {
        let order = match filter.sort {
            FlightSort::Price => "current_price, departure_time",
            FlightSort::Departure => "departure_time, current_price",
        };
        let sql = format!(
            r#"
            SELECT {}
            FROM flights
            WHERE ($1::text IS NULL OR origin = upper($1))
              AND ($2::text IS NULL OR destination = upper($2))
              AND ($3::date IS NULL OR (departure_time AT TIME ZONE 'UTC')::date = $3)
              AND ($4::timestamptz IS NULL OR departure_time > $4)
            ORDER BY {}
            "#,
            FLIGHT_COLUMNS, order
        );
        let rows = sqlx::query_as::<_, FlightRow>(&sql)
            .bind(filter.origin.as_deref())
            .bind(filter.destination.as_deref())
            .bind(filter.date)
            .bind(filter.departing_after)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.into_iter().map(Flight::try_from).collect()
    }

    async fn find_booking_by_pnr(&self, pnr: &Pnr) -> LedgerResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE pnr = $1", BOOKING_COLUMNS);
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(pnr.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.map(Booking::try_from).transpose()
    }

    async fn list_bookings_for_flight(&self, id: FlightId) -> LedgerResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE flight_id = $1 ORDER BY created_at, pnr",
            BOOKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.into_iter().map(Booking::try_from).collect()
    }
}

/// Dropping an unfinished transaction returns the connection and rolls back.
pub struct PgTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTransaction {
    fn conn(&mut self) -> LedgerResult<&mut PgConnection> {
        self.tx.as_deref_mut().ok_or(LedgerError::TransactionClosed)
    }

    async fn update_flight_column<T>(&mut self, id: FlightId, sql: &str, value: T) -> LedgerResult<()>
    where
        T: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + 'static,
    {
        let result = sqlx::query(sql)
            .bind(id)
            .bind(value)
            .execute(self.conn()?)
            .await
            .map_err(|e| match db_code(&e).as_deref() {
                Some(CHECK_VIOLATION) => LedgerError::SeatCountOutOfRange(id),
                Some(LOCK_NOT_AVAILABLE) => LedgerError::LockTimeout(id),
                _ => backend(e),
            })?;
        if result.rows_affected() == 0 {
            return Err(LedgerError::FlightNotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerTransaction for PgTransaction {
    async fn get_flight_for_update(&mut self, id: FlightId) -> LedgerResult<Option<Flight>> {
        let sql = format!("SELECT {} FROM flights WHERE id = $1 FOR UPDATE", FLIGHT_COLUMNS);
        let row = sqlx::query_as::<_, FlightRow>(&sql)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await
            .map_err(|e| match db_code(&e).as_deref() {
                Some(LOCK_NOT_AVAILABLE) => LedgerError::LockTimeout(id),
                _ => backend(e),
            })?;
        row.map(Flight::try_from).transpose()
    }

    async fn set_available_seats(&mut self, id: FlightId, available: u32) -> LedgerResult<()> {
        let available = i32::try_from(available).map_err(|_| LedgerError::SeatCountOutOfRange(id))?;
        self.update_flight_column(id, "UPDATE flights SET available_seats = $2 WHERE id = $1", available)
            .await
    }

    async fn set_current_price(&mut self, id: FlightId, price: Decimal) -> LedgerResult<()> {
        self.update_flight_column(id, "UPDATE flights SET current_price = $2 WHERE id = $1", price)
            .await
    }

    async fn set_demand_level(&mut self, id: FlightId, level: DemandLevel) -> LedgerResult<()> {
        self.update_flight_column(id, "UPDATE flights SET demand_level = $2 WHERE id = $1", level.as_str())
            .await
    }

    async fn list_active_seat_labels(&mut self, id: FlightId) -> LedgerResult<BTreeSet<SeatLabel>> {
        let labels: Vec<String> = sqlx::query_scalar(
            "SELECT seat_label FROM bookings WHERE flight_id = $1 AND status = 'CONFIRMED'",
        )
        .bind(id)
        .fetch_all(self.conn()?)
        .await
        .map_err(backend)?;

        labels
            .iter()
            .map(|label| {
                label
                    .parse::<SeatLabel>()
                    .map_err(|e| LedgerError::Corrupt(format!("flight {}: {}", id, e)))
            })
            .collect()
    }

    async fn insert_booking(&mut self, booking: &Booking) -> LedgerResult<()> {
        let sql = format!(
            "INSERT INTO bookings ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            BOOKING_COLUMNS
        );
        sqlx::query(&sql)
            .bind(booking.id)
            .bind(booking.pnr.as_str())
            .bind(booking.flight_id)
            .bind(&booking.passenger.first_name)
            .bind(&booking.passenger.last_name)
            .bind(booking.passenger.age as i16)
            .bind(booking.passenger.email.expose())
            .bind(booking.passenger.phone.expose())
            .bind(booking.seat_label.to_string())
            .bind(booking.booking_price)
            .bind(booking.status.as_str())
            .bind(booking.payment_status.as_str())
            .bind(&booking.transaction_id)
            .bind(&booking.payment_method)
            .bind(booking.created_at)
            .bind(booking.cancelled_at)
            .execute(self.conn()?)
            .await
            .map_err(|e| match (db_code(&e).as_deref(), db_constraint(&e).as_deref()) {
                (Some(UNIQUE_VIOLATION), Some("bookings_active_seat_key")) => {
                    LedgerError::SeatConflict(booking.flight_id, booking.seat_label)
                }
                (Some(UNIQUE_VIOLATION), _) => LedgerError::DuplicatePnr(booking.pnr.clone()),
                _ => backend(e),
            })?;
        Ok(())
    }

    async fn update_booking_status(&mut self, pnr: &Pnr, change: StatusChange) -> LedgerResult<()> {
        let result = sqlx::query(
            "UPDATE bookings SET status = $2, payment_status = $3, cancelled_at = $4 WHERE pnr = $1",
        )
        .bind(pnr.as_str())
        .bind(change.status.as_str())
        .bind(change.payment_status.as_str())
        .bind(change.cancelled_at)
        .execute(self.conn()?)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::BookingNotFound(pnr.clone()));
        }
        Ok(())
    }

    async fn find_booking_by_pnr(&mut self, pnr: &Pnr) -> LedgerResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE pnr = $1", BOOKING_COLUMNS);
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(pnr.as_str())
            .fetch_optional(self.conn()?)
            .await
            .map_err(backend)?;
        row.map(Booking::try_from).transpose()
    }

    async fn pnr_exists(&mut self, pnr: &Pnr) -> LedgerResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM bookings WHERE pnr = $1)")
            .bind(pnr.as_str())
            .fetch_one(self.conn()?)
            .await
            .map_err(backend)
    }

    async fn commit(&mut self) -> LedgerResult<()> {
        let tx = self.tx.take().ok_or(LedgerError::TransactionClosed)?;
        tx.commit().await.map_err(backend)
    }

    async fn rollback(&mut self) -> LedgerResult<()> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await.map_err(backend),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn flight_row() -> FlightRow {
        let departure = Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap();
        FlightRow {
            id: Uuid::new_v4(),
            flight_number: "UK815".to_string(),
            airline: "Vistara".to_string(),
            origin: "DEL".to_string(),
            destination: "BOM".to_string(),
            departure_time: departure,
            arrival_time: departure + chrono::Duration::minutes(120),
            base_price: dec!(5200),
            current_price: dec!(5460.00),
            total_seats: 180,
            available_seats: 172,
            demand_level: "very_high".to_string(),
        }
    }

    fn booking_row() -> BookingRow {
        BookingRow {
            id: Uuid::new_v4(),
            pnr: "q3k9zt".to_string(),
            flight_id: Uuid::new_v4(),
            first_name: "Meera".to_string(),
            last_name: "Iyer".to_string(),
            age: 29,
            email: "meera@example.com".to_string(),
            phone: "+91 98000 11111".to_string(),
            seat_label: "14F".to_string(),
            booking_price: dec!(5460.00),
            status: "CANCELLED".to_string(),
            payment_status: "REFUND_PENDING".to_string(),
            transaction_id: "sim_abc".to_string(),
            payment_method: "card".to_string(),
            created_at: Utc::now(),
            cancelled_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_flight_row_conversion() {
        let flight = Flight::try_from(flight_row()).unwrap();
        assert_eq!(flight.available_seats, 172);
        assert_eq!(flight.demand_level, DemandLevel::VeryHigh);

        let mut unknown = flight_row();
        unknown.demand_level = "surging".to_string();
        assert_eq!(Flight::try_from(unknown).unwrap().demand_level, DemandLevel::Medium);

        let mut negative = flight_row();
        negative.available_seats = -1;
        assert!(matches!(Flight::try_from(negative), Err(LedgerError::Corrupt(_))));
    }

    #[test]
    fn test_booking_row_conversion() {
        let booking = Booking::try_from(booking_row()).unwrap();
        assert_eq!(booking.pnr.as_str(), "Q3K9ZT");
        assert_eq!(booking.seat_label.to_string(), "14F");
        assert_eq!(booking.status, BookingStatus::Cancelled);
        assert_eq!(booking.payment_status, PaymentStatus::RefundPending);

        let mut bad_seat = booking_row();
        bad_seat.seat_label = "99Z".to_string();
        assert!(matches!(Booking::try_from(bad_seat), Err(LedgerError::Corrupt(_))));

        let mut bad_status = booking_row();
        bad_status.status = "HELD".to_string();
        assert!(matches!(Booking::try_from(bad_status), Err(LedgerError::Corrupt(_))));
    }
}
