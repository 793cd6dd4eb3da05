//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between the
//! [`App`] state machine and a platform-specific [`Driver`].

use crate::{App, AppAction, AppEvent, Driver};

/// Generic runtime that orchestrates App and Driver.
pub struct Runtime<D: Driver> {
    driver: D,
    app: App,
}

impl<D: Driver> Runtime<D> {
    /// Create a runtime around an app that has not started yet.
    pub fn new(driver: D, app: App) -> Self {
        Self { driver, app }
    }

    /// Run the main event loop.
    ///
    /// Renders, starts connecting, then feeds every polled event to the App
    /// until it asks to quit or the driver runs out of events.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(&mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;

        let actions = self.app.start();
        let mut quit = self.process_actions(actions).await?;

        while !quit {
            let Some(event) = self.driver.poll_event().await? else {
                tracing::debug!("event source exhausted");
                break;
            };
            quit = self.handle_event(event).await?;
        }

        self.driver.stop();
        Ok(())
    }

    /// Feed one event to the App and execute the resulting actions.
    ///
    /// Returns `true` if the application should quit.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to execute an action.
    pub async fn handle_event(&mut self, event: AppEvent) -> Result<bool, D::Error> {
        let now = self.driver.now();
        let actions = self.app.handle(event, now);
        self.process_actions(actions).await
    }

    /// Execute actions returned by the App.
    ///
    /// Returns `true` if should quit.
    async fn process_actions(&mut self, actions: Vec<AppAction>) -> Result<bool, D::Error> {
        for action in actions {
            match action {
                AppAction::Render => self.driver.render(&self.app)?,
                AppAction::Quit => return Ok(true),
                AppAction::Transport(request) => self.driver.execute(request).await?,
                AppAction::Connected(profile) => self.driver.remember(&profile),
            }
        }
        Ok(false)
    }

    /// Get a reference to the App
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Get a reference to the Driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Split into driver and app.
    pub fn into_parts(self) -> (D, App) {
        (self.driver, self.app)
    }
}
