//! SDL2 Window Display Module
//! Provides an SDL2 window that renders packed BGR/RGB frames and reports
//! when the operator closes the window or presses the cancel key.

use color_eyre::{eyre::eyre, Result};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};
use sdl2::EventPump;
use tracing::info;

use crate::capture::{Frame, PixelFormat};
use crate::display::sink::DisplaySurface;
use crate::error::StopReason;
use crate::DisplayConfig;

/// SDL2 Window Display
pub struct Sdl2Display {
    texture_creator: TextureCreator<WindowContext>,
    canvas: Canvas<Window>,
    event_pump: EventPump,
    cancel_key: Option<Keycode>,
    _sdl_context: sdl2::Sdl,
}

impl Sdl2Display {
    pub fn new(config: &DisplayConfig, width: u32, height: u32) -> Result<Self> {
        let sdl_context = sdl2::init().map_err(|e| eyre!(e))?;
        let video_subsystem = sdl_context.video().map_err(|e| eyre!(e))?;

        let window = video_subsystem
            .window(&config.title, width, height)
            .position_centered()
            .build()?;

        let canvas = window.into_canvas().present_vsync().build()?;
        let texture_creator = canvas.texture_creator();
        let event_pump = sdl_context.event_pump().map_err(|e| eyre!(e))?;

        let cancel_key = Keycode::from_name(&config.cancel_key.to_ascii_uppercase().to_string());
        info!(
            "SDL2 window {}x{}, cancel key {:?}",
            width, height, config.cancel_key
        );

        Ok(Self {
            texture_creator,
            canvas,
            event_pump,
            cancel_key,
            _sdl_context: sdl_context,
        })
    }

    fn render_frame(&mut self, frame: &Frame) -> Result<()> {
        let geometry = frame.geometry();
        let format = match frame.format() {
            PixelFormat::Bgr24 => PixelFormatEnum::BGR24,
            PixelFormat::Rgb24 => PixelFormatEnum::RGB24,
        };

        let mut texture = self
            .texture_creator
            .create_texture_streaming(format, geometry.width, geometry.height)
            .map_err(|e| eyre!(e))?;

        texture
            .update(None, frame.data(), geometry.row_len())
            .map_err(|e| eyre!(e))?;

        self.canvas.clear();
        self.canvas
            .copy(&texture, None, None)
            .map_err(|e| eyre!(e))?;

        self.canvas.present();
        Ok(())
    }
}

impl DisplaySurface for Sdl2Display {
    fn show(&mut self, frame: &Frame) -> Result<(), StopReason> {
        self.render_frame(frame)
            .map_err(|e| StopReason::DeliveryFailure(e.to_string()))
    }

    fn poll_cancel_key(&mut self) -> bool {
        let mut cancel = false;
        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => {
                    info!("Quit event received");
                    cancel = true;
                }
                Event::KeyDown {
                    keycode: Some(key), ..
                } if Some(key) == self.cancel_key => {
                    info!("Cancel key pressed");
                    cancel = true;
                }
                _ => {}
            }
        }
        cancel
    }
}
