// src/services/availability_service.rs

use chrono::{Duration, NaiveDate, NaiveTime};
use sqlx::{Executor, Sqlite};

use crate::{
    common::error::AppError,
    db::VehicleRepository,
    models::vehicle::{Interval, Reservation, Slot, SlotGridResponse, Vehicle, VehicleStatus},
};

/// Calendar grid shape: `step_minutes` slots between `window_start` and `window_end`.
#[derive(Debug, Clone, Copy)]
pub struct SlotGridLayout {
    pub step_minutes: i64,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
}

impl Default for SlotGridLayout {
    fn default() -> Self {
        Self {
            step_minutes: 30,
            window_start: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN),
            window_end: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// A slot is available when at least one of `vehicle_ids` has no reservation
/// overlapping it. An empty candidate set yields an all-unavailable grid.
pub fn build_slot_grid(
    date: NaiveDate,
    layout: SlotGridLayout,
    vehicle_ids: &[i64],
    reservations: &[Reservation],
) -> Vec<Slot> {
    let step = Duration::minutes(layout.step_minutes.max(1));
    let window_end = date.and_time(layout.window_end);
    let mut cursor = date.and_time(layout.window_start);
    let mut slots = Vec::new();

    while cursor + step <= window_end {
        let slot = Interval { start: cursor, end: cursor + step };
        let available = vehicle_ids.iter().any(|vehicle_id| {
            !reservations
                .iter()
                .any(|r| r.vehicle_id == *vehicle_id && r.interval().overlaps(&slot))
        });
        slots.push(Slot {
            start: slot.start,
            end: slot.end,
            start_time: slot.start.format("%H:%M").to_string(),
            end_time: slot.end.format("%H:%M").to_string(),
            available,
        });
        cursor += step;
    }

    slots
}

#[derive(Clone)]
pub struct AvailabilityService {
    vehicles: VehicleRepository,
    grid: SlotGridLayout,
}

impl AvailabilityService {
    pub fn new(vehicles: VehicleRepository) -> Self {
        Self { vehicles, grid: SlotGridLayout::default() }
    }

    /// Must run on the same transaction that then writes the reservation.
    pub async fn find_available<'e, E>(
        &self,
        executor: E,
        window: Interval,
        vehicle_id: Option<i64>,
        exclude_request_id: Option<i64>,
    ) -> Result<Option<Vehicle>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        self.vehicles
            .find_available(executor, window, vehicle_id, exclude_request_id)
            .await
    }

    pub async fn slot_grid(&self, date: NaiveDate, vehicle_id: Option<i64>) -> Result<SlotGridResponse, AppError> {
        let day_start = date.and_time(NaiveTime::MIN);
        let day_end = day_start + Duration::days(1);

        let candidates: Vec<i64> = match vehicle_id {
            Some(id) => {
                let vehicle = self
                    .vehicles
                    .find_by_id(self.vehicles.pool(), id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Vehicle", id))?;
                if vehicle.status == VehicleStatus::Active { vec![vehicle.id] } else { Vec::new() }
            }
            None => self.vehicles.list(true).await?.into_iter().map(|v| v.id).collect(),
        };

        let reservations = self
            .vehicles
            .reservations_between(day_start, day_end, vehicle_id)
            .await?;

        Ok(SlotGridResponse {
            date,
            vehicle_id,
            slots: build_slot_grid(date, self.grid, &candidates, &reservations),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        date.and_hms_opt(h, m, 0).unwrap()
    }

    fn reservation(vehicle_id: i64, start: NaiveDateTime, end: NaiveDateTime) -> Reservation {
        Reservation { request_id: 1, vehicle_id, start_datetime: start, end_datetime: end }
    }

    #[test]
    fn half_open_intervals_touching_at_the_edge_do_not_overlap() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let nine_ten = Interval::new(at(day, 9, 0), at(day, 10, 0)).unwrap();
        let ten_eleven = Interval::new(at(day, 10, 0), at(day, 11, 0)).unwrap();
        let half_past = Interval::new(at(day, 9, 30), at(day, 10, 30)).unwrap();
        let inside = Interval::new(at(day, 9, 15), at(day, 9, 45)).unwrap();

        assert!(!nine_ten.overlaps(&ten_eleven));
        assert!(!ten_eleven.overlaps(&nine_ten));
        assert!(nine_ten.overlaps(&half_past));
        assert!(half_past.overlaps(&nine_ten));
        assert!(nine_ten.overlaps(&inside));
        assert!(inside.overlaps(&nine_ten));
    }

    #[test]
    fn empty_or_inverted_intervals_are_rejected() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(Interval::new(at(day, 9, 0), at(day, 9, 0)).is_none());
        assert!(Interval::new(at(day, 10, 0), at(day, 9, 0)).is_none());
    }

    #[test]
    fn default_grid_covers_six_to_ten_in_half_hours() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let slots = build_slot_grid(day, SlotGridLayout::default(), &[1], &[]);
        assert_eq!(slots.len(), 32);
        assert_eq!(slots[0].start_time, "06:00");
        assert_eq!(slots[0].end_time, "06:30");
        assert_eq!(slots[31].end_time, "22:00");
        assert!(slots.iter().all(|s| s.available));
    }

    #[test]
    fn slot_is_free_while_any_candidate_vehicle_is_free() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let booked = [reservation(1, at(day, 9, 0), at(day, 10, 0))];

        let single = build_slot_grid(day, SlotGridLayout::default(), &[1], &booked);
        let nine = single.iter().find(|s| s.start_time == "09:00").unwrap();
        let nine_thirty = single.iter().find(|s| s.start_time == "09:30").unwrap();
        let ten = single.iter().find(|s| s.start_time == "10:00").unwrap();
        assert!(!nine.available);
        assert!(!nine_thirty.available);
        assert!(ten.available);

        let fleet = build_slot_grid(day, SlotGridLayout::default(), &[1, 2], &booked);
        assert!(fleet.iter().all(|s| s.available));
    }

    #[test]
    fn no_candidates_means_nothing_is_available() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let slots = build_slot_grid(day, SlotGridLayout::default(), &[], &[]);
        assert!(slots.iter().all(|s| !s.available));
    }
}
