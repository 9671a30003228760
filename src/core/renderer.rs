//! Parallel render driver.

use crate::core::cie;
use crate::core::config::Config;
use crate::core::denoise::DenoiseBuffer;
use crate::core::image::{Image, SaveError};
use crate::core::material::{AIR_MATERIAL, DEFAULT_MATERIAL, FOG_MATERIAL};
use crate::core::scene::Scene;
use glam::Vec3;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Pixels a worker claims per trip to the shared counter.
const CLAIM_HANDFUL: usize = 100;

/// The counter every worker pops pixel groups from. `remaining` walks
/// down from the pixel count; `completed` walks up to it.
struct PixelCounter {
    remaining: usize,
    completed: usize,
}

impl PixelCounter {
    /// Claim up to [`CLAIM_HANDFUL`] pixels off the top, or `None`
    /// when the frame is exhausted.
    fn claim(&mut self) -> Option<std::ops::Range<usize>> {
        if self.remaining == 0 {
            return None;
        }
        let end = self.remaining;
        let start = end.saturating_sub(CLAIM_HANDFUL);
        self.remaining = start;
        Some(start..end)
    }
}

/// Buffers a worker writes into, guarded together with the counter by
/// one mutex. Pixel claims are disjoint, so each index is written by
/// exactly one worker.
struct SharedFrame<'a> {
    counter: PixelCounter,
    colours: &'a mut [Vec3],
    denoise: Option<&'a mut DenoiseBuffer>,
}

/// Drives a fixed pool of worker threads over the pixel grid and owns
/// the auxiliary channels of the last rendered frame.
#[derive(Default)]
pub struct Renderer {
    denoiser: Option<DenoiseBuffer>,
}

impl Renderer {
    /// Create a renderer, forcing the process-wide immutable state
    /// (material singletons, CIE table) so workers never contend over
    /// first use.
    pub fn new() -> Self {
        Lazy::force(&DEFAULT_MATERIAL);
        Lazy::force(&AIR_MATERIAL);
        Lazy::force(&FOG_MATERIAL);
        cie::init();
        Self { denoiser: None }
    }

    /// Render a scene to a pixel buffer. Builds the BVH, then shades
    /// with one worker per hardware core, each claiming groups of
    /// pixels from a shared counter; the calling thread reports
    /// progress until the counter fills.
    ///
    /// * `scene` - The scene; mutated only to update the camera and
    ///             build its BVH.
    /// * `w`     - Output width in pixels.
    /// * `h`     - Output height in pixels.
    pub fn render(&mut self, scene: &mut Scene, w: usize, h: usize) -> Image {
        let mut img = Image::default();
        if !scene.validated {
            warn!("Unable to render invalid scene");
            return img;
        }
        let config = Config::get();
        let start = Instant::now();

        img.w = w;
        img.h = h;
        scene.camera.update(w, h);

        info!("Generating BVH...");
        scene.build_bvh();
        img.prepare = start.elapsed().as_secs_f32();

        info!("Rendering rays...");
        let total = w * h;
        let cores = num_cpus::get().max(1);
        let mut colours = vec![Vec3::ZERO; total];
        let mut denoiser = config.denoise.then(|| DenoiseBuffer::new(w, h));

        {
            let scene = &*scene;
            let shared = Mutex::new(SharedFrame {
                counter: PixelCounter {
                    remaining: total,
                    completed: 0,
                },
                colours: &mut colours,
                denoise: denoiser.as_mut(),
            });

            thread::scope(|s| {
                for _ in 0..cores {
                    s.spawn(|| render_pixels(&shared, scene, w));
                }

                let progress = ProgressBar::new(total as u64);
                progress.set_style(
                    ProgressStyle::with_template("Progress: [{bar:50}] {percent:>3}%")
                        .expect("static progress template")
                        .progress_chars("= "),
                );
                loop {
                    let completed = shared.lock().expect("render mutex poisoned").counter.completed;
                    progress.set_position(completed as u64);
                    if completed >= total {
                        break;
                    }
                    thread::sleep(Duration::from_millis(50));
                }
                progress.finish();
            });
        }

        let post = Instant::now();
        img.colours = colours;
        self.denoiser = denoiser;
        img.post = post.elapsed().as_secs_f32();
        img.time = start.elapsed().as_secs_f32();
        img
    }

    /// Write the auxiliary denoiser channels of the last render next
    /// to the beauty image. A no-op when channel collection is off.
    ///
    /// * `path` - The beauty image path.
    pub fn save_composites<P: AsRef<Path>>(&self, path: P) -> Result<(), SaveError> {
        match &self.denoiser {
            Some(buffer) => buffer.save(path),
            None => Ok(()),
        }
    }
}

/// Worker loop: claim a pixel group, shade it outside the lock, then
/// publish each pixel and bump the completion counter under the lock.
fn render_pixels(shared: &Mutex<SharedFrame>, scene: &Scene, w: usize) {
    let denoise_on = Config::get().denoise;
    loop {
        let group = {
            let mut frame = shared.lock().expect("render mutex poisoned");
            frame.counter.claim()
        };
        let Some(group) = group else {
            return;
        };
        for i in group {
            let (x, y) = (i % w, i / w);
            let colour = scene.shade_pixel(x, y).rgb();
            let meta = denoise_on
                .then(|| scene.poll_metadata(&scene.camera.generate_ray(x, y)))
                .flatten();

            let mut frame = shared.lock().expect("render mutex poisoned");
            frame.colours[i] = colour;
            if let Some(denoise) = frame.denoise.as_deref_mut() {
                denoise.record(i, meta);
            }
            frame.counter.completed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn claims_partition_the_frame() {
        let counter = Arc::new(Mutex::new(PixelCounter {
            remaining: 10_123,
            completed: 0,
        }));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let counter = counter.clone();
            handles.push(thread::spawn(move || {
                let mut claimed = Vec::new();
                loop {
                    let group = counter.lock().unwrap().claim();
                    match group {
                        Some(range) => claimed.extend(range),
                        None => return claimed,
                    }
                }
            }));
        }
        let mut seen = HashSet::new();
        for handle in handles {
            for i in handle.join().unwrap() {
                assert!(seen.insert(i), "pixel {} claimed twice", i);
            }
        }
        assert_eq!(seen.len(), 10_123);
    }

    #[test]
    fn claims_never_exceed_the_handful() {
        let mut counter = PixelCounter {
            remaining: 250,
            completed: 0,
        };
        let first = counter.claim().unwrap();
        assert_eq!(first, 150..250);
        let second = counter.claim().unwrap();
        assert_eq!(second, 50..150);
        let third = counter.claim().unwrap();
        assert_eq!(third, 0..50);
        assert!(counter.claim().is_none());
    }
}
