use embedded_io_async::{Read, ReadReady, Write};
use log::debug;

use crate::{Clock, Command, DeviceID, Error, SensorReading, Sds011, MIN_QUERY_INTERVAL_MS};

/// Spacing and duplicate tracking for measurement queries.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct QueryState {
    last_query_ms: Option<u64>,
    last_raw: Option<(u16, u16)>,
}

impl QueryState {
    // Records an attempt at `now`, unless the previous one is too recent.
    fn admit(&mut self, now: u64) -> Result<(), Error> {
        if let Some(last) = self.last_query_ms {
            if now.saturating_sub(last) < MIN_QUERY_INTERVAL_MS {
                return Err(Error::RateLimited);
            }
        }
        self.last_query_ms = Some(now);
        Ok(())
    }

    // Stores `raw` as the latest sample unless it repeats the previous one.
    fn accept(&mut self, raw: (u16, u16)) -> Result<(), Error> {
        if self.last_raw == Some(raw) {
            return Err(Error::NoNewData);
        }
        self.last_raw = Some(raw);
        Ok(())
    }
}

impl<S, C> Sds011<S, C>
where
    S: Read + Write + ReadReady,
    C: Clock,
{
    /// Queries one measurement from the sensor `id`.
    ///
    /// # Returns
    ///
    /// * `Ok(SensorReading)` for a sample that differs from the previous one.
    /// * `Err(Error::RateLimited)` if the previous query was issued less than three
    ///   seconds ago; nothing is sent.
    /// * `Err(Error::NoNewData)` if the sensor repeated the previous raw values,
    ///   meaning it is alive but has not sampled again yet.
    /// * `Err(Error::ResponseError)` if the exchange timed out or the reply was invalid.
    pub async fn query_data(&mut self, id: DeviceID) -> Result<SensorReading, Error> {
        self.query.admit(self.clock.now_ms()).map_err(|e| {
            debug!("Query rejected, previous one less than {} ms ago", MIN_QUERY_INTERVAL_MS);
            e
        })?;

        debug!("Querying sensor data (CMD 0x04)");
        let reply = self
            .exchange(Command::Query, id)
            .await
            .map_err(Error::into_response_error)?;

        let raw = reply.measurement();
        self.query.accept(raw).map_err(|e| {
            debug!("Sensor repeated raw sample {:?}", raw);
            e
        })?;

        let reading = SensorReading::from_raw(raw, reply.id());
        debug!(
            "Processed frame - PM2.5: {}, PM10: {}",
            reading.pm2_5, reading.pm10
        );
        Ok(reading)
    }
}
