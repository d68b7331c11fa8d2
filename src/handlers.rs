//! Booking pages.
//!
//! Reservations never reach a database: the pending reservation travels in
//! the session between the search, form and summary pages.

use axum::{
    Form, Router,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::app::AppState;
use crate::context::RequestContext;
use crate::error::{AppError, Result};
use crate::render::TemplateData;
use crate::session::{ERROR_KEY, FLASH_KEY, Session};

/// Session key of the address recorded by the home page
pub const REMOTE_ADDR_KEY: &str = "remote_addr";
/// Session key of the reservation in progress
pub const RESERVATION_KEY: &str = "reservation";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A bookable room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Room {
    pub id: u32,
    pub name: &'static str,
    pub path: &'static str,
}

pub const ROOMS: [Room; 2] = [
    Room {
        id: 1,
        name: "General's Quarters",
        path: "/generals-quarters",
    },
    Room {
        id: 2,
        name: "Major's Suite",
        path: "/majors-suite",
    },
];

pub fn find_room(id: u32) -> Option<&'static Room> {
    ROOMS.iter().find(|room| room.id == id)
}

/// Reservation kept in the session while the guest fills in the forms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub room_id: Option<u32>,
    pub room_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityForm {
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

#[derive(Debug, Deserialize)]
pub struct ReservationForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl ReservationForm {
    /// Field name to message for every missing or malformed value
    fn errors(&self) -> BTreeMap<&'static str, &'static str> {
        let mut errors = BTreeMap::new();
        for (field, value) in [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("phone", &self.phone),
        ] {
            if value.trim().is_empty() {
                errors.insert(field, "This field cannot be blank");
            }
        }
        if !self.email.trim().is_empty() && !self.email.contains('@') {
            errors.insert("email", "Invalid email address");
        }
        errors
    }
}

/// Routes for every page
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/about", get(about))
        .route("/generals-quarters", get(generals_quarters))
        .route("/majors-suite", get(majors_suite))
        .route(
            "/search-availability",
            get(search_availability).post(post_availability),
        )
        .route("/choose-room/{id}", get(choose_room))
        .route(
            "/make-reservation",
            get(make_reservation).post(post_reservation),
        )
        .route("/reservation-summary", get(reservation_summary))
        .route("/contact", get(contact))
}

fn session(ctx: &RequestContext) -> Result<&Session> {
    ctx.session()
        .ok_or_else(|| AppError::internal("Session layer is not installed"))
}

fn page_title(title: &str) -> TemplateData {
    TemplateData::new().with_string("title", title)
}

/// Leave a one-shot error message and send the browser to `to`
fn redirect_with_error(session: &Session, message: &str, to: &str) -> Response {
    session.put_string(ERROR_KEY, message);
    Redirect::to(to).into_response()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

pub async fn home(State(state): State<AppState>, ctx: RequestContext) -> Result<Response> {
    let remote = ctx
        .remote_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_default();
    tracing::info!(remote = %remote, "Home page visit");
    session(&ctx)?.put_string(REMOTE_ADDR_KEY, remote.clone());

    let data = page_title("Home, welcome!").with_string(REMOTE_ADDR_KEY, remote);
    Ok(state.templates.render_page(&ctx, "home.page.hbs", data))
}

pub async fn about(State(state): State<AppState>, ctx: RequestContext) -> Result<Response> {
    let mut data = page_title("About Us");
    if let Some(remote) = session(&ctx)?.get_string(REMOTE_ADDR_KEY) {
        data = data.with_string(REMOTE_ADDR_KEY, remote);
    }
    Ok(state.templates.render_page(&ctx, "about.page.hbs", data))
}

pub async fn generals_quarters(State(state): State<AppState>, ctx: RequestContext) -> Response {
    let data = page_title("General's Quarters").with_int("room_id", 1);
    state.templates.render_page(&ctx, "generals.page.hbs", data)
}

pub async fn majors_suite(State(state): State<AppState>, ctx: RequestContext) -> Response {
    let data = page_title("Major's Suite").with_int("room_id", 2);
    state.templates.render_page(&ctx, "majors.page.hbs", data)
}

pub async fn search_availability(State(state): State<AppState>, ctx: RequestContext) -> Response {
    state
        .templates
        .render_page(&ctx, "search-availability.page.hbs", page_title("Search Availability"))
}

/// Store the requested dates as a pending reservation and offer the rooms
pub async fn post_availability(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<AvailabilityForm>,
) -> Result<Response> {
    let session = session(&ctx)?;

    let (Some(start), Some(end)) = (parse_date(&form.start_date), parse_date(&form.end_date))
    else {
        return Ok(redirect_with_error(
            session,
            "Please enter valid arrival and departure dates",
            "/search-availability",
        ));
    };

    if end <= start {
        return Ok(redirect_with_error(
            session,
            "Departure must be after arrival",
            "/search-availability",
        ));
    }

    let reservation = Reservation {
        start_date: Some(start),
        end_date: Some(end),
        ..Reservation::default()
    };
    session.put(RESERVATION_KEY, &reservation)?;

    let mut data = page_title("Choose Your Room")
        .with_string("start_date", start.format(DATE_FORMAT).to_string())
        .with_string("end_date", end.format(DATE_FORMAT).to_string());
    data.insert_data("rooms", &ROOMS)?;
    Ok(state.templates.render_page(&ctx, "choose-room.page.hbs", data))
}

/// Attach a room to the pending reservation
pub async fn choose_room(ctx: RequestContext, Path(id): Path<u32>) -> Result<Response> {
    let session = session(&ctx)?;

    let Some(mut reservation) = session.get::<Reservation>(RESERVATION_KEY)? else {
        return Ok(redirect_with_error(session, "Can't get reservation from session", "/"));
    };
    let Some(room) = find_room(id) else {
        return Ok(redirect_with_error(session, "Invalid room selection", "/search-availability"));
    };

    reservation.room_id = Some(room.id);
    reservation.room_name = Some(room.name.to_string());
    session.put(RESERVATION_KEY, &reservation)?;

    Ok(Redirect::to("/make-reservation").into_response())
}

fn reservation_data(reservation: &Reservation) -> Result<TemplateData> {
    let mut data = page_title("Make Reservation");
    if let Some(start) = reservation.start_date {
        data = data.with_string("start_date", start.format(DATE_FORMAT).to_string());
    }
    if let Some(end) = reservation.end_date {
        data = data.with_string("end_date", end.format(DATE_FORMAT).to_string());
    }
    data.insert_data(RESERVATION_KEY, reservation)?;
    Ok(data)
}

pub async fn make_reservation(State(state): State<AppState>, ctx: RequestContext) -> Result<Response> {
    let session = session(&ctx)?;
    let Some(reservation) = session.get::<Reservation>(RESERVATION_KEY)? else {
        return Ok(redirect_with_error(session, "Can't get reservation from session", "/"));
    };

    let data = reservation_data(&reservation)?;
    Ok(state.templates.render_page(&ctx, "make-reservation.page.hbs", data))
}

/// Complete the pending reservation, or show the form again with errors
pub async fn post_reservation(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<ReservationForm>,
) -> Result<Response> {
    let session = session(&ctx)?;
    let Some(mut reservation) = session.get::<Reservation>(RESERVATION_KEY)? else {
        return Ok(redirect_with_error(session, "Can't get reservation from session", "/"));
    };

    let errors = form.errors();
    reservation.first_name = form.first_name.trim().to_string();
    reservation.last_name = form.last_name.trim().to_string();
    reservation.email = form.email.trim().to_string();
    reservation.phone = form.phone.trim().to_string();

    if !errors.is_empty() {
        let mut data = reservation_data(&reservation)?;
        data.insert_data("errors", &errors)?;
        return Ok(state.templates.render_page(&ctx, "make-reservation.page.hbs", data));
    }

    tracing::info!(
        room_id = ?reservation.room_id,
        start_date = ?reservation.start_date,
        "Reservation completed"
    );
    session.put(RESERVATION_KEY, &reservation)?;
    session.put_string(FLASH_KEY, "Reservation submitted");

    Ok(Redirect::to("/reservation-summary").into_response())
}

/// Show the reservation once, then forget it
pub async fn reservation_summary(State(state): State<AppState>, ctx: RequestContext) -> Result<Response> {
    let session = session(&ctx)?;
    let Some(reservation) = session.pop::<Reservation>(RESERVATION_KEY)? else {
        tracing::warn!("No reservation in session for summary");
        return Ok(redirect_with_error(session, "Can't get reservation from session", "/"));
    };

    let mut data = reservation_data(&reservation)?;
    data = data.with_string("title", "Reservation Summary");
    Ok(state.templates.render_page(&ctx, "reservation-summary.page.hbs", data))
}

pub async fn contact(State(state): State<AppState>, ctx: RequestContext) -> Response {
    state
        .templates
        .render_page(&ctx, "contact.page.hbs", page_title("Contact Us"))
}
