use index_vec::IndexVec;

use super::{CoreError, CoreInputs, Hit, RayId, RtCore};
use crate::geometry::RayRequest;

impl RtCore {
    /// Streams a batch of rays through the core with an always ready consumer and returns
    /// the nearest hit of each ray, in request order.
    pub fn trace(&mut self, rays: &[RayRequest]) -> Result<Vec<Option<Hit>>, CoreError> {
        self.trace_with(rays, |_, _| {})
    }

    /// Same as `trace`, calling `on_result` with the request index as results come out of
    /// the core (in completion order, not request order).
    pub fn trace_with(
        &mut self,
        rays: &[RayRequest],
        mut on_result: impl FnMut(usize, &Option<Hit>),
    ) -> Result<Vec<Option<Hit>>, CoreError> {
        let in_flight = self.in_flight();
        if in_flight > 0 {
            return Err(CoreError::Busy { in_flight });
        }

        let mut owners: IndexVec<RayId, Option<usize>> =
            IndexVec::from_vec(vec![None; self.config.max_working_rays.get()]);
        let mut results = vec![None; rays.len()];
        let mut next = 0;
        let mut completed = 0;
        let mut idle_cycles = 0u64;

        while completed < rays.len() {
            let report = self.tick(&CoreInputs {
                request: rays.get(next).copied(),
                result_ready: true,
            });

            let mut progress = false;
            if let Some(ray) = report.accepted {
                owners[ray] = Some(next);
                next += 1;
                progress = true;
            }
            if let Some(result) = report.result.filter(|_| report.delivered) {
                let index = owners[result.ray]
                    .take()
                    .ok_or(CoreError::UnexpectedResult { ray: result.ray })?;
                results[index] = result.hit;
                on_result(index, &result.hit);
                completed += 1;
                progress = true;
            }

            if progress {
                idle_cycles = 0;
            } else {
                idle_cycles += 1;
                if self.config.watchdog_cycles > 0 && idle_cycles >= self.config.watchdog_cycles {
                    let in_flight = self.in_flight();
                    tracing::warn!(
                        cycles = idle_cycles,
                        in_flight,
                        trv = ?self.trv_phase(),
                        "watchdog expired"
                    );
                    return Err(CoreError::Watchdog {
                        cycles: idle_cycles,
                        in_flight,
                    });
                }
            }
        }

        tracing::debug!(rays = rays.len(), cycles = self.stats.cycles, "batch traced");
        Ok(results)
    }
}
